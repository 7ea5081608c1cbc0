use storefront_state_macros::Action;

#[derive(Action)]
enum CartAction {
    #[start] #[fail] LoadCart,
}

fn main() {
    let _ = CartAction::LoadCart;
}
