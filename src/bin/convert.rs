use conv3d::material::MaterialCache;
use conv3d::native::export::save_obj;
use conv3d::{ConvertOpts, NativeScene, SourceObject, StandardConverter, convert_tree};

fn main() {
    env_logger::init();

    let mut src = None;
    let mut dst = None;
    macro_rules! help {
        () => {{
            eprintln!("[HELP]: \nConvert a received object tree to an OBJ scene.");
            eprintln!("Basic Usage: <bin> tree.json out.obj");
            return;
        }};
    }
    for v in std::env::args().skip(1) {
        if matches!(v.as_str(), "-h" | "--help") {
            help!();
        }
        if src.is_none() {
            src = Some(v);
        } else if dst.is_none() {
            dst = Some(v)
        } else {
            help!();
        };
    }
    let Some(src) = src else {
        help!();
    };
    let Some(dst) = dst else {
        help!();
    };
    if src.starts_with("-") || dst.starts_with("-") {
        help!();
    }
    println!("[INFO]: {src} -> {dst}");

    let bytes = std::fs::read(&src).expect("Failed to read input");
    let root = SourceObject::from_json_slice(&bytes).expect("Failed to parse object tree");
    println!("[INFO]: parsed {} objects", root.tree_len());

    let mut scene = NativeScene::new();
    let mut converter = StandardConverter::new(MaterialCache::new());
    let mut converted = 0;
    let mut failed = 0;
    for item in convert_tree(&root, &mut scene, &mut converter, ConvertOpts::default()) {
        let outcome = item.expect("Conversion run aborted");
        match outcome.error() {
            None => converted += 1,
            Some(e) => {
                failed += 1;
                eprintln!("[WARN]: {} failed: {e}", outcome.context().current.id);
            }
        }
    }
    println!("[INFO]: converted {converted} objects ({failed} failed)");

    save_obj(&scene, &dst).expect("Failed to save scene");
}
