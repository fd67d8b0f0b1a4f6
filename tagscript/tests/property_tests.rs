use proptest::prelude::*;
use tagscript::script::lexer::{Lexer, TokenKind};
use tagscript::script::node::{Node, NodeStats};
use tagscript::{parse, render_str, EmptyContext};

/// A template with balanced loops, paired with its number of `FOR` tags.
fn balanced_template() -> impl Strategy<Value = (String, usize)> {
    let leaf = prop_oneof![
        "[a-z ,]{0,8}".prop_map(|s| (s, 0)),
        Just(("{$= i 1 + $}".to_owned(), 0)),
        Just(("{$= \"s\" $}".to_owned(), 0)),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(|parts| {
            let mut src = "{$ FOR i 1 2 $}".to_owned();
            let mut loops = 1;
            for (part, n) in parts {
                src.push_str(&part);
                loops += n;
            }
            src.push_str("{$ END $}");
            (src, loops)
        })
    })
}

fn document() -> impl Strategy<Value = (String, usize)> {
    prop::collection::vec(balanced_template(), 0..4).prop_map(|parts| {
        let mut src = "<".to_owned();
        let mut loops = 0;
        for (part, n) in parts {
            src.push_str(&part);
            loops += n;
        }
        (src, loops)
    })
}

proptest! {
    #[test]
    fn balanced_loops_parse_and_count((src, loops) in document()) {
        let tree = parse(&src).unwrap();
        prop_assert_eq!(NodeStats::collect(&tree).loops, loops);
        prop_assert!(render_str(&src, &EmptyContext).is_ok());
    }

    #[test]
    fn regenerated_source_parses_to_the_same_tree((src, _) in document()) {
        let tree = parse(&src).unwrap();
        prop_assert_eq!(parse(&tree.to_source()).unwrap(), tree);
    }

    #[test]
    fn text_without_tags_renders_verbatim(src in "[a-zA-Z0-9 \n\t.,;:!?$}-]{1,64}") {
        prop_assert_eq!(render_str(&src, &EmptyContext).unwrap(), src);
    }

    #[test]
    fn escaped_text_renders_back(text in "\\PC{1,64}") {
        let src = Node::Document(vec![Node::Text(text.clone())]).to_source();
        prop_assert_eq!(render_str(&src, &EmptyContext).unwrap(), text);
    }

    #[test]
    fn parser_never_panics(src in "[{}$=a-zA-Z0-9 .\"\\\\@+*/^-]{0,40}") {
        let _ = parse(&src);
    }

    #[test]
    fn lexer_is_fused(src in "\\PC{0,40}") {
        let mut lexer = Lexer::new(&src);
        for item in lexer.by_ref() {
            match item {
                Ok(tok) if tok.kind == TokenKind::Eof => break,
                Ok(_) => {}
                Err(_) => break,
            }
        }
        prop_assert!(lexer.next().is_none());
    }
}
