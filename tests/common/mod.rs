#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SHEET: &str = "Capability List";

pub fn caplook_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("caplook");
    path
}

/// Column letters for a zero-based index (0 -> A, 26 -> AA).
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn sheet_xml(rows: &[Vec<&str>]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
    );
    for (r, row) in rows.iter().enumerate() {
        let cells: String = row
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_empty())
            .map(|(c, v)| {
                let reference = format!("{}{}", column_name(c), r + 1);
                match v.parse::<f64>() {
                    Ok(_) => format!("<c r=\"{}\"><v>{}</v></c>", reference, v),
                    Err(_) => format!(
                        "<c r=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                        reference,
                        escape(v)
                    ),
                }
            })
            .collect();
        if !cells.is_empty() {
            xml.push_str(&format!("<row r=\"{}\">{}</row>", r + 1, cells));
        }
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// A minimal `.xlsx` with one worksheet per `(name, rows)` entry. Empty
/// strings are left out of the sheet entirely.
pub fn xlsx_bytes(sheets: &[(&str, Vec<Vec<&str>>)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();

        let overrides: String = (1..=sheets.len())
            .map(|i| {
                format!(
                    "<Override PartName=\"/xl/worksheets/sheet{}.xml\" \
                     ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
                    i
                )
            })
            .collect();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
                 <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
                 <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
                 <Override PartName=\"/xl/workbook.xml\" \
                 ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
                 {}</Types>",
                overrides
            )
            .as_bytes(),
        )
        .unwrap();

        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(
            b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
              <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
              <Relationship Id=\"rId1\" \
              Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" \
              Target=\"xl/workbook.xml\"/></Relationships>",
        )
        .unwrap();

        let sheet_entries: String = sheets
            .iter()
            .enumerate()
            .map(|(i, (name, _))| {
                format!(
                    "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
                    escape(name),
                    i + 1,
                    i + 1
                )
            })
            .collect();
        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
                 xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
                 <sheets>{}</sheets></workbook>",
                sheet_entries
            )
            .as_bytes(),
        )
        .unwrap();

        let relationships: String = (1..=sheets.len())
            .map(|i| {
                format!(
                    "<Relationship Id=\"rId{}\" \
                     Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" \
                     Target=\"worksheets/sheet{}.xml\"/>",
                    i, i
                )
            })
            .collect();
        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        zip.write_all(
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
                 {}</Relationships>",
                relationships
            )
            .as_bytes(),
        )
        .unwrap();

        for (i, (_, rows)) in sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
                .unwrap();
            zip.write_all(sheet_xml(rows).as_bytes()).unwrap();
        }

        zip.finish().unwrap();
    }
    buf
}

/// Write a workbook whose only sheet is the capability sheet.
pub fn write_capability_workbook(path: &Path, rows: Vec<Vec<&str>>) {
    fs::write(path, xlsx_bytes(&[(SHEET, rows)])).unwrap();
}

/// Header on the second row, two capabilities and a blank separator row.
pub fn standard_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec!["Project Phoenix estimate", "", ""],
        vec!["Capability", "Scope / Business Description", "System Changes"],
        vec![
            "Customer Consent Review",
            "Review current consent capture for marketing",
            "Update consent service",
        ],
        vec!["", "", ""],
        vec!["Mutual Funds Selection", "Let advisers shortlist funds", ""],
    ]
}

pub fn write_config(root: &Path, workbooks: &Path) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let content = format!(
        r#"[db]
path = "{}/data/caplook.sqlite"

[workbooks]
root = "{}"
include_globs = ["*.xlsx"]

[embedding]
provider = "hash"
dims = 256

[generation]
provider = "disabled"
"#,
        root.display(),
        workbooks.display()
    );
    let path = config_dir.join("caplook.toml");
    fs::write(&path, content).unwrap();
    path
}

