use conv3d::convert::Converter;
use conv3d::material::MaterialCache;
use conv3d::traversal::Traversal;
use conv3d::{SourceObject, StandardConverter};
use std::collections::BTreeMap;

fn main() {
    env_logger::init();

    macro_rules! help {
        () => {{
            eprintln!("Usage: <bin> tree.json");
            return;
        }};
    }
    let mut src = None;
    for v in std::env::args().skip(1) {
        if src.is_none() {
            src = Some(v);
        } else {
            help!();
        };
    }
    let Some(src) = src else {
        help!();
    };
    if src.starts_with("-") {
        help!();
    }
    println!("[INFO]: Info about {src}:");

    let bytes = std::fs::read(&src).expect("Failed to read input");
    let root = SourceObject::from_json_slice(&bytes).expect("Failed to parse object tree");

    let traversal = Traversal::flatten(&root);
    let converter = StandardConverter::new(MaterialCache::new());

    let mut by_type = BTreeMap::new();
    let mut max_depth = 0;
    let mut convertible = 0;
    for ctx in traversal.contexts() {
        *by_type.entry(ctx.current.ty_short().to_string()).or_insert(0) += 1;
        max_depth = max_depth.max(ctx.depth);
        if converter.can_convert(ctx.current) {
            convertible += 1;
        }
    }

    println!("#Objects = {}", traversal.len());
    println!("#Convertible = {convertible}");
    println!("Max Depth = {max_depth}");
    println!("- Types:");
    for (ty, count) in by_type {
        println!("{count:>8} {ty}");
    }
}
