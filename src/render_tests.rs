#[cfg(test)]
mod tests {
    //! Generated code pinned against the compiler and rendered through the
    //! runtime. The components below are copied from the compiler's output
    //! for the templates next to them; each test first checks the compiler
    //! still prints exactly that body.
    #![allow(non_snake_case, unused_mut, unused_parens, unused_variables)]

    use crate::component::SourceFile;
    use crate::config::{Config, OutputMode};
    use crate::logger::NoopLogger;
    use crate::pipeline::compile_sources;
    use crate::runtime as rt;
    use crate::runtime::{Attrs, Node};
    use std::path::PathBuf;

    /// Compile (name, props, html) components into one single-file module.
    fn generate(components: &[(&str, &str, &str)]) -> String {
        let mut text = String::new();
        for (name, props, html) in components {
            text.push_str(&format!("<!-- + define \"{}\" -->\n", name));
            if !props.is_empty() {
                text.push_str(&format!("<!-- | define \"props\" -->\n{}\n<!-- | end -->\n", props));
            }
            text.push_str(&format!("<!-- | define \"html\" -->\n{}\n<!-- | end -->\n<!-- + end -->\n", html));
        }
        let config = Config {
            mode: OutputMode::SingleFile,
            format: false,
            ..Config::default()
        };
        let source = SourceFile {
            path: PathBuf::from("components.html"),
            content: text,
        };
        let compiled = compile_sources(&[source], &config, &NoopLogger).unwrap();
        compiled.files[0].contents.clone()
    }

    fn assert_body(generated: &str, name: &str, expr: &str) {
        let body = format!(
            "pub fn {name}Comp(mut props: {name}, attrs: Attrs, children: Vec<Node>) -> Node {{\n    \
             props.Attrs = attrs;\n    let attrs = &props.Attrs;\n    {expr}\n}}\n",
            name = name,
            expr = expr
        );
        assert!(generated.contains(&body), "expected\n{}\nin\n{}", body, generated);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // <div class="x">{props.name}</div>
    // ═══════════════════════════════════════════════════════════════════════════

    #[derive(Default)]
    pub struct Greeting {
        pub Name: String,
        pub Attrs: Attrs,
    }

    impl Greeting {
        pub fn get(mut self, children: Vec<Node>) -> Node {
            let attrs = std::mem::take(&mut self.Attrs);
            GreetingComp(self, attrs, children)
        }
    }

    pub fn GreetingComp(mut props: Greeting, attrs: Attrs, children: Vec<Node>) -> Node {
        props.Attrs = attrs;
        let attrs = &props.Attrs;
        rt::element("div", rt::attrs(vec![("class", rt::raw("x"))]), vec![rt::node(&(props.Name))])
    }

    #[test]
    fn test_prop_text_renders_escaped() {
        let generated = generate(&[("Greeting", "name: string", r#"<div class="x">{props.name}</div>"#)]);
        assert!(generated.contains("pub struct Greeting {\n    pub Name: String,\n    pub Attrs: Attrs,\n}"));
        assert_body(
            &generated,
            "Greeting",
            r#"rt::element("div", rt::attrs(vec![("class", rt::raw("x"))]), vec![rt::node(&(props.Name))])"#,
        );

        let html = Greeting {
            Name: "hi".into(),
            ..Default::default()
        }
        .get(vec![])
        .render_to_string();
        assert_eq!(html, r#"<div class="x">hi</div>"#);

        let html = Greeting {
            Name: "<b>&".into(),
            ..Default::default()
        }
        .get(vec![])
        .render_to_string();
        assert_eq!(html, r#"<div class="x">&lt;b&gt;&amp;</div>"#);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // <for items={props.items} as="row"><li>{row}</li></for>
    // ═══════════════════════════════════════════════════════════════════════════

    #[derive(Default)]
    pub struct Rows {
        pub Items: Vec<String>,
        pub Attrs: Attrs,
    }

    pub fn RowsComp(mut props: Rows, attrs: Attrs, children: Vec<Node>) -> Node {
        props.Attrs = attrs;
        let attrs = &props.Attrs;
        { let mut __items: Vec<rt::Node> = Vec::new(); for row in &(props.Items) { __items.push(rt::element("li", rt::Attrs::new(), vec![rt::node(&(row))])); } rt::fragment(__items) }
    }

    #[test]
    fn test_loop_renders_each_item_in_order() {
        let generated = generate(&[("Rows", "items: []string", r#"<for items={props.items} as="row"><li>{row}</li></for>"#)]);
        assert!(generated.contains("pub Items: Vec<String>,"));
        assert_body(
            &generated,
            "Rows",
            r#"{ let mut __items: Vec<rt::Node> = Vec::new(); for row in &(props.Items) { __items.push(rt::element("li", rt::Attrs::new(), vec![rt::node(&(row))])); } rt::fragment(__items) }"#,
        );

        let props = Rows {
            Items: vec!["a".into(), "b".into()],
            ..Default::default()
        };
        assert_eq!(RowsComp(props, Attrs::new(), vec![]).render_to_string(), "<li>a</li><li>b</li>");
        assert_eq!(RowsComp(Rows::default(), Attrs::new(), vec![]).render_to_string(), "");
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // <if condition={props.n == 1}>1</if><elseif ...>2</elseif><else>3</else>
    // ═══════════════════════════════════════════════════════════════════════════

    #[derive(Default)]
    pub struct Pick {
        pub N: i64,
        pub Attrs: Attrs,
    }

    pub fn PickComp(mut props: Pick, attrs: Attrs, children: Vec<Node>) -> Node {
        props.Attrs = attrs;
        let attrs = &props.Attrs;
        if (props.N == 1) { rt::raw("1") } else if (props.N == 2) { rt::raw("2") } else { rt::raw("3") }
    }

    #[test]
    fn test_first_matching_branch_wins() {
        let generated = generate(&[(
            "Pick",
            "n: int",
            "<if condition={props.n == 1}>1</if>\n<elseif condition={props.n == 2}>2</elseif>\n<else>3</else>",
        )]);
        assert_body(
            &generated,
            "Pick",
            r#"if (props.N == 1) { rt::raw("1") } else if (props.N == 2) { rt::raw("2") } else { rt::raw("3") }"#,
        );

        let render = |n| PickComp(Pick { N: n, ..Default::default() }, Attrs::new(), vec![]).render_to_string();
        assert_eq!(render(1), "1");
        assert_eq!(render(2), "2");
        assert_eq!(render(7), "3");
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Panel: <main><slot name="body"/></main>
    // Shell: <Panel><slot name="body"><p>x</p></slot></Panel>
    // ═══════════════════════════════════════════════════════════════════════════

    #[derive(Default)]
    pub struct Panel {
        pub SlotBody: Node,
        pub Attrs: Attrs,
    }

    pub fn PanelComp(mut props: Panel, attrs: Attrs, children: Vec<Node>) -> Node {
        props.Attrs = attrs;
        let attrs = &props.Attrs;
        rt::element("main", rt::Attrs::new(), vec![rt::node(&props.SlotBody)])
    }

    #[derive(Default)]
    pub struct Shell {
        pub Attrs: Attrs,
    }

    pub fn ShellComp(mut props: Shell, attrs: Attrs, children: Vec<Node>) -> Node {
        props.Attrs = attrs;
        let attrs = &props.Attrs;
        PanelComp(Panel { SlotBody: rt::element("p", rt::Attrs::new(), vec![rt::raw("x")]), ..Default::default() }, rt::Attrs::new(), vec![])
    }

    #[test]
    fn test_slot_content_lands_in_the_placeholder() {
        let generated = generate(&[
            ("Panel", "", r#"<main><slot name="body"/></main>"#),
            ("Shell", "", r#"<Panel><slot name="body"><p>x</p></slot></Panel>"#),
        ]);
        assert!(generated.contains("pub struct Panel {\n    pub SlotBody: Node,\n    pub Attrs: Attrs,\n}"));
        assert_body(
            &generated,
            "Panel",
            r#"rt::element("main", rt::Attrs::new(), vec![rt::node(&props.SlotBody)])"#,
        );
        assert_body(
            &generated,
            "Shell",
            r#"PanelComp(Panel { SlotBody: rt::element("p", rt::Attrs::new(), vec![rt::raw("x")]), ..Default::default() }, rt::Attrs::new(), vec![])"#,
        );

        assert_eq!(
            ShellComp(Shell::default(), Attrs::new(), vec![]).render_to_string(),
            "<main><p>x</p></main>"
        );
        assert_eq!(
            PanelComp(Panel::default(), Attrs::new(), vec![]).render_to_string(),
            "<main></main>"
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // <p>{props.a} and {props.b}</p>
    // ═══════════════════════════════════════════════════════════════════════════

    #[derive(Default)]
    pub struct Pair {
        pub A: String,
        pub B: i64,
        pub Attrs: Attrs,
    }

    pub fn PairComp(mut props: Pair, attrs: Attrs, children: Vec<Node>) -> Node {
        props.Attrs = attrs;
        let attrs = &props.Attrs;
        rt::element("p", rt::Attrs::new(), vec![rt::fragment(vec![rt::node(&(props.A)), rt::raw(" and "), rt::node(&(props.B))])])
    }

    #[test]
    fn test_text_and_expressions_keep_their_order() {
        let generated = generate(&[("Pair", "a: string\nb: int", "<p>{props.a} and {props.b}</p>")]);
        assert_body(
            &generated,
            "Pair",
            r#"rt::element("p", rt::Attrs::new(), vec![rt::fragment(vec![rt::node(&(props.A)), rt::raw(" and "), rt::node(&(props.B))])])"#,
        );

        let props = Pair {
            A: "x".into(),
            B: 2,
            ..Default::default()
        };
        assert_eq!(PairComp(props, Attrs::new(), vec![]).render_to_string(), "<p>x and 2</p>");
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // <a href={$attrs.href}>go</a>
    // ═══════════════════════════════════════════════════════════════════════════

    #[derive(Default)]
    pub struct Link {
        pub Attrs: Attrs,
    }

    pub fn LinkComp(mut props: Link, attrs: Attrs, children: Vec<Node>) -> Node {
        props.Attrs = attrs;
        let attrs = &props.Attrs;
        rt::element("a", rt::attrs(vec![("href", rt::lookup(&attrs, "href"))]), vec![rt::raw("go")])
    }

    #[test]
    fn test_passthrough_attributes_are_looked_up() {
        let generated = generate(&[("Link", "", r#"<a href={$attrs.href}>go</a>"#)]);
        assert_body(
            &generated,
            "Link",
            r#"rt::element("a", rt::attrs(vec![("href", rt::lookup(&attrs, "href"))]), vec![rt::raw("go")])"#,
        );

        let html = LinkComp(Link::default(), rt::attrs(vec![("href", rt::raw("/home"))]), vec![]).render_to_string();
        assert_eq!(html, r#"<a href="/home">go</a>"#);

        let html = LinkComp(Link::default(), Attrs::new(), vec![]).render_to_string();
        assert_eq!(html, r#"<a href="">go</a>"#);
    }
}
