//! Candidate-to-expression behavior across realistic element shapes.

use flashloop_core_types::{ElementInfo, SelectorSet};
use flashloop_locator::{candidates_for, locator_expression, Candidate};

fn element(selectors: SelectorSet, frame_chain: Vec<String>) -> ElementInfo {
    ElementInfo {
        id: "input-00c0ffee-0".into(),
        tag_name: "input".into(),
        input_type: Some("text".into()),
        name: None,
        description: String::new(),
        selectors,
        xpath: "/html[1]/body[1]/form[1]/input[1]".into(),
        frame_chain,
        is_scrollable: false,
        is_in_viewport: true,
        is_sensitive: false,
    }
}

#[test]
fn test_best_candidate_wins_the_expression() {
    let info = element(
        SelectorSet {
            test_id: Some("email-field".into()),
            role: Some("textbox".into()),
            role_name: Some("Email".into()),
            placeholder: Some("you@example.com".into()),
            ..Default::default()
        },
        Vec::new(),
    );

    let candidates = candidates_for(&info);
    let first = locator_expression(&info.frame_chain, &candidates[0]);
    assert_eq!(first, "page.getByTestId('email-field')");

    // Every later candidate still compiles to a runnable expression.
    for candidate in &candidates[1..] {
        let expr = locator_expression(&info.frame_chain, candidate);
        assert!(expr.starts_with("page."), "{expr}");
    }
}

#[test]
fn test_frame_nested_element_chains_frame_locators() {
    let info = element(
        SelectorSet {
            placeholder: Some("Card number".into()),
            ..Default::default()
        },
        vec![
            "iframe[name=\"checkout\"]".into(),
            "iframe[src*=\"/secure/card\"]".into(),
        ],
    );

    let candidates = candidates_for(&info);
    let expr = locator_expression(&info.frame_chain, &candidates[0]);
    assert_eq!(
        expr,
        "page.frameLocator('iframe[name=\"checkout\"]')\
         .frameLocator('iframe[src*=\"/secure/card\"]')\
         .getByPlaceholder('Card number')"
    );
}

#[test]
fn test_bare_element_falls_back_to_xpath() {
    let info = element(SelectorSet::default(), Vec::new());
    let candidates = candidates_for(&info);
    assert_eq!(candidates.len(), 1);
    assert!(matches!(&candidates[0], Candidate::XPath(xpath) if xpath.starts_with("/html[1]")));
    assert_eq!(
        locator_expression(&info.frame_chain, &candidates[0]),
        "page.locator('xpath=/html[1]/body[1]/form[1]/input[1]')"
    );
}

#[test]
fn test_id_rooted_xpath_passes_through() {
    let mut info = element(SelectorSet::default(), Vec::new());
    info.xpath = "//*[@id=\"submit\"]".into();
    let candidates = candidates_for(&info);
    assert_eq!(
        locator_expression(&info.frame_chain, &candidates[0]),
        "page.locator('xpath=//*[@id=\"submit\"]')"
    );
}
