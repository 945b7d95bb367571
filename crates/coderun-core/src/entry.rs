//! Entry-type name derivation for languages whose public type must match the file name

use once_cell::sync::Lazy;
use regex::Regex;

// Longest name accepted as a file stem; file systems cap names at 255 bytes.
const MAX_NAME_LEN: usize = 200;

static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").expect("comment pattern is valid"));

static PUBLIC_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bpublic\s+(?:(?:final|abstract|sealed|strictfp)\s+)*class\s+([A-Za-z_$][A-Za-z0-9_$]*)",
    )
    .expect("public type pattern is valid")
});

/// Name of the first `public class` declared in `source`, ignoring comments.
///
/// Returns `None` when no declaration is found or the name is unusable as a
/// file stem; callers fall back to a fixed default.
pub fn public_type_name(source: &str) -> Option<String> {
    let stripped = COMMENT.replace_all(source, " ");
    let name = PUBLIC_TYPE.captures(&stripped)?.get(1)?.as_str();
    (name.len() <= MAX_NAME_LEN).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_public_class() {
        let src = "import java.util.*;\n\npublic class Solution {\n  public static void main(String[] a) {}\n}";
        assert_eq!(public_type_name(src), Some("Solution".to_string()));
    }

    #[test]
    fn no_public_class_yields_none() {
        assert_eq!(public_type_name("class Main {}"), None);
        assert_eq!(public_type_name(""), None);
        assert_eq!(public_type_name("public interface Shape {}"), None);
    }

    #[test]
    fn first_of_several_candidates_wins() {
        let src = "public class First {}\npublic class Second {}";
        assert_eq!(public_type_name(src), Some("First".to_string()));
    }

    #[test]
    fn modifiers_are_skipped() {
        assert_eq!(public_type_name("public final class Sealed {}"), Some("Sealed".to_string()));
        assert_eq!(public_type_name("public  abstract\tclass Base {}"), Some("Base".to_string()));
    }

    #[test]
    fn commented_declarations_are_ignored() {
        let src = "// public class Old {}\n/* public class Older {} */\npublic class Current {}";
        assert_eq!(public_type_name(src), Some("Current".to_string()));
    }

    #[test]
    fn path_characters_never_leak_into_the_name() {
        assert_eq!(public_type_name("public class ../../etc/passwd {}"), None);
        assert_eq!(public_type_name("public class Evil/../x {}"), Some("Evil".to_string()));
    }

    #[test]
    fn pathological_nesting_is_handled() {
        let mut src = String::new();
        for _ in 0..10_000 {
            src.push_str("/* public class Nope { ");
        }
        src.push_str("*/ public class Deep {}");
        assert_eq!(public_type_name(&src), Some("Deep".to_string()));
    }

    #[test]
    fn overlong_names_fall_back() {
        let src = format!("public class {} {{}}", "A".repeat(MAX_NAME_LEN + 1));
        assert_eq!(public_type_name(&src), None);
    }

    #[test]
    fn nested_static_class_is_not_the_entry_type() {
        let src = "class Main {\n  public static class Node { int v; }\n  public static void main(String[] a) {}\n}";
        assert_eq!(public_type_name(src), None);
    }

    #[test]
    fn nested_class_after_public_outer_is_ignored() {
        let src = "public class Outer {\n  public static class Inner {}\n}";
        assert_eq!(public_type_name(src), Some("Outer".to_string()));
    }

    #[test]
    fn identifier_not_glued_to_other_words() {
        assert_eq!(public_type_name("notpublic class X {}"), None);
    }
}
