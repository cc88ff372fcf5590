//! Login form heuristic
//!
//! A form is a login form when its `id`, `name` or `class` names it as one,
//! or when its subtree holds both a password input and a username-like input.

use scraper::ElementRef;

const FORM_TOKENS: &[&str] = &["login", "signin", "log-in", "sign-in"];
const USERNAME_TOKENS: &[&str] = &["user", "email", "login", "name"];

/// Evaluates the heuristic for one `form` element
pub fn is_login_form(form: ElementRef<'_>) -> bool {
    let el = form.value();
    let named_as_login = ["id", "name", "class"]
        .iter()
        .filter_map(|attr| el.attr(attr))
        .any(|value| contains_any(value, FORM_TOKENS));

    if named_as_login {
        return true;
    }

    let mut has_password = false;
    let mut has_username = false;

    // descendants() walks the subtree without recursion
    for node in form.descendants() {
        let Some(input) = ElementRef::wrap(node) else {
            continue;
        };
        if input.value().name() != "input" {
            continue;
        }

        let input_type = input.value().attr("type").unwrap_or("").to_ascii_lowercase();
        match input_type.as_str() {
            "password" => has_password = true,
            "text" | "email" => {
                let identified = ["name", "id"]
                    .iter()
                    .filter_map(|attr| input.value().attr(attr))
                    .any(|value| contains_any(value, USERNAME_TOKENS));
                if identified {
                    has_username = true;
                }
            }
            _ => {}
        }

        if has_password && has_username {
            return true;
        }
    }

    false
}

fn contains_any(value: &str, tokens: &[&str]) -> bool {
    let lowered = value.to_lowercase();
    tokens.iter().any(|token| lowered.contains(token))
}
