use storefront_state_macros::Action;

#[derive(Action)]
struct Loaded;

fn main() {
    let _ = Loaded;
}
