use std::io::Write;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // For each descriptor recorded in tests/data (hex text, one or more
    // whitespace-separated byte values per line), create one test function
    // that parses it and renders both output forms.
    let datadir: PathBuf = [concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data")]
        .iter()
        .collect();
    let out_dir = std::env::var_os("OUT_DIR").unwrap();
    let dest_path = PathBuf::from(&out_dir).join("corpus-descriptors.rs");
    let mut file = std::fs::File::create(dest_path)?;

    writeln!(file, "use hidrawctl::ReportDescriptor;")?;
    writeln!(file)?;

    std::fs::read_dir(datadir)
        .unwrap()
        .flatten()
        .for_each(|rdesc| {
            let filename = rdesc.file_name().into_string().unwrap();
            let Some(stem) = filename.strip_suffix(".hex") else {
                return;
            };
            let funcname = stem.replace([':', '.', '-'], "_");
            let path = rdesc.path();
            writeln!(
                file,
                "
#[test]
#[allow(non_snake_case)]
fn corpus_{funcname}() {{
    let text = std::fs::read_to_string({path:?}).unwrap();
    let bytes: Vec<u8> = text
        .split_whitespace()
        .map(|tok| u8::from_str_radix(tok, 16).unwrap())
        .collect();
    let rdesc = ReportDescriptor::parse(&bytes);
    let annotated = rdesc.to_string();
    assert!(annotated.ends_with(&format!(\"// {{}} bytes\\n\", bytes.len())));
    let _ = rdesc.dump_tree();
}}
"
            )
            .unwrap();
        });

    Ok(())
}
