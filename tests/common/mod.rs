//! Test utilities and HTML fixtures for the cellarscrape test suite

use cellarscrape::HtmlDocument;

pub const SEARCH_URL: &str = "https://www.example.com/find/margaux";
pub const DETAIL_URL: &str = "https://www.example.com/find/opus-one";

/// Creates a test HTML document with specified content
#[allow(dead_code)]
pub fn create_test_html(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body>
    {body}
</body>
</html>"#
    )
}

/// Parses `html` as if it had been served from `url`
#[allow(dead_code)]
pub fn parse(html: &str, url: &str) -> HtmlDocument {
    HtmlDocument::parse_with_url(html, url).expect("fixture URL is valid")
}

/// One search result card with a name and a dollar price
#[allow(dead_code)]
pub fn wine_card(i: usize) -> String {
    format!(
        r#"<div class="wine-card">
            <a class="wine-name" href="/find/chateau-{i}">Chateau {i} 2015</a>
            <span class="price">${}.00</span>
        </div>"#,
        40 + i
    )
}

/// Search results page with `cards` cards and an optional next link
#[allow(dead_code)]
pub fn search_page_html(cards: usize, next: Option<&str>) -> String {
    let mut body: String = (0..cards).map(wine_card).collect();
    if let Some(href) = next {
        body.push_str(&format!(r#"<a rel="next" href="{href}">Next</a>"#));
    }
    create_test_html("Margaux prices", &body)
}

/// Detail page listing `offers` merchants, priced $10, $11, ...
#[allow(dead_code)]
pub fn detail_page_html(offers: usize) -> String {
    let mut body = String::from(r#"<h1 class="wine-name">Opus One 2018</h1>"#);
    for i in 0..offers {
        body.push_str(&format!(
            r#"<div class="offer-card">
                <span class="merchant-name">Shop {i}</span>
                <span class="price">${}.00</span>
                <span class="location">Napa</span>
            </div>"#,
            10 + i
        ));
    }
    create_test_html("Opus One 2018", &body)
}

/// Detail page whose merchant offers are rows of a table
#[allow(dead_code)]
pub fn detail_offer_table_html(offers: usize) -> String {
    let mut body = String::from(r#"<h1 class="wine-name">Opus One 2018</h1><table>"#);
    for i in 0..offers {
        body.push_str(&format!(
            r#"<tr class="merchant"><td class="merchant-name">Shop {i}</td><td class="price">${}.00</td></tr>"#,
            10 + i
        ));
    }
    body.push_str("</table>");
    create_test_html("Opus One 2018", &body)
}

/// Merchant page that only links to products, each link listed twice
#[allow(dead_code)]
pub fn hub_page_html(links: usize) -> String {
    let mut body = String::from(r#"<h1>Cellar Shop</h1><a href="/merchant/cellar-shop/about">About</a>"#);
    for i in (0..links).chain(0..links) {
        body.push_str(&format!(r#"<a href="/find/chateau-{i}">Chateau {i}</a>"#));
    }
    create_test_html("Cellar Shop", &body)
}

/// Block page served in place of a listing
#[allow(dead_code)]
pub fn blocked_page_html() -> String {
    create_test_html(
        "Access Denied",
        "<h1>Access Denied</h1><p>Reference #18.2f</p>",
    )
}

/// Challenge page that still renders the listing underneath the widget
#[allow(dead_code)]
pub fn challenge_page_html() -> String {
    let body = format!(
        r#"<iframe id="captcha-frame" src="/verify"></iframe>{}"#,
        wine_card(0)
    );
    create_test_html("Margaux prices", &body)
}

/// Plain listing table with a header row and `rows` data rows
#[allow(dead_code)]
pub fn table_page_html(rows: usize) -> String {
    let mut body = String::from("<table><tr><th>Wine</th><th>Price</th></tr>");
    for i in 0..rows {
        body.push_str(&format!(
            "<tr><td>Rioja Reserva {}</td><td>€15,50</td></tr>",
            2010 + i
        ));
    }
    body.push_str("</table>");
    create_test_html("Rioja prices", &body)
}
