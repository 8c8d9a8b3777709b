//! Playwright locator expressions for the recorded script.

use crate::candidates::Candidate;

/// Escape a value for a single-quoted JavaScript string literal.
pub fn escape_single_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// The literal script expression reproducing an accepted candidate, chained
/// behind the element's iframe path.
pub fn locator_expression(frame_chain: &[String], candidate: &Candidate) -> String {
    let mut expr = String::from("page");
    for frame_selector in frame_chain {
        expr.push_str(&format!(
            ".frameLocator('{}')",
            escape_single_quoted(frame_selector)
        ));
    }
    match candidate {
        Candidate::TestId(test_id) => {
            expr.push_str(&format!(".getByTestId('{}')", escape_single_quoted(test_id)));
        }
        Candidate::Role { role, name } => {
            expr.push_str(&format!(
                ".getByRole('{}', {{ name: '{}', exact: true }})",
                escape_single_quoted(role),
                escape_single_quoted(name)
            ));
        }
        Candidate::Placeholder(placeholder) => {
            expr.push_str(&format!(
                ".getByPlaceholder('{}')",
                escape_single_quoted(placeholder)
            ));
        }
        Candidate::Text(text) => {
            expr.push_str(&format!(
                ".getByText('{}', {{ exact: true }})",
                escape_single_quoted(text)
            ));
        }
        Candidate::XPath(xpath) => {
            expr.push_str(&format!(".locator('xpath={}')", escape_single_quoted(xpath)));
        }
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape_single_quoted("plain"), "plain");
        assert_eq!(escape_single_quoted("it's"), "it\\'s");
        assert_eq!(escape_single_quoted("a\\b"), "a\\\\b");
        assert_eq!(escape_single_quoted("line\nbreak"), "line\\nbreak");
    }

    #[test]
    fn test_role_expression() {
        let expr = locator_expression(
            &[],
            &Candidate::Role {
                role: "button".into(),
                name: "Login".into(),
            },
        );
        assert_eq!(expr, "page.getByRole('button', { name: 'Login', exact: true })");
    }

    #[test]
    fn test_frame_chain_expression() {
        let chain = vec!["iframe[name=\"outer\"]".to_string(), "iframe:nth-of-type(2)".to_string()];
        let expr = locator_expression(&chain, &Candidate::TestId("pay".into()));
        assert_eq!(
            expr,
            "page.frameLocator('iframe[name=\"outer\"]').frameLocator('iframe:nth-of-type(2)').getByTestId('pay')"
        );
    }

    #[test]
    fn test_xpath_expression() {
        let expr = locator_expression(&[], &Candidate::XPath("/html[1]/body[1]/div[2]".into()));
        assert_eq!(expr, "page.locator('xpath=/html[1]/body[1]/div[2]')");
    }

    #[test]
    fn test_quotes_inside_values() {
        let expr = locator_expression(&[], &Candidate::Text("Don't click".into()));
        assert_eq!(expr, "page.getByText('Don\\'t click', { exact: true })");
    }
}
