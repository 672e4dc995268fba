use axum::response::{Html, Redirect};

const SCANNER_PAGE: &str = include_str!("../../assets/scanner.html");
const ADMIN_PAGE: &str = include_str!("../../assets/admin.html");

pub async fn scanner_page() -> Html<&'static str> {
    Html(SCANNER_PAGE)
}

pub async fn admin_page() -> Html<&'static str> {
    Html(ADMIN_PAGE)
}

pub async fn index() -> Redirect {
    Redirect::temporary("/scanner")
}
