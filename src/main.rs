use RustedChebop::Examples::bvp_examples::bvp_examples;

fn main() {
    let example = 1;
    if let Err(e) = bvp_examples(example) {
        eprintln!("example {} failed: {}", example, e);
    }
}
