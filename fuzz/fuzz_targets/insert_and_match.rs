#![no_main]
use libfuzzer_sys::fuzz_target;
use muxtree::{Node, Params};

fuzz_target!(|data: (Vec<(String, i32)>, Vec<String>)| {
    let mut tree = Node::new();

    for (route, item) in data.0 {
        if tree.insert(route, item).is_err() {
            return;
        }
    }

    let mut params = Params::new();
    for path in &data.1 {
        let _ = tree.find(path, &mut params);
        let _ = tree.at(path);
    }
});
