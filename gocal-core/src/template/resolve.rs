//! The three template passes: loops, variables, includes.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{GoCalResult, TemplateError};

/// Data a view is rendered against.
pub type Context = serde_json::Map<String, Value>;

static LOOP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)@loop\{(.*?)\}(.*?)@endloop").expect("LOOP_RE should compile - this is a bug")
});

static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@include\{(.*?)\}").expect("INCLUDE_RE should compile - this is a bug")
});

/// Expand every `@loop{name} body @endloop` block of `view`.
///
/// `name` must be a list or map in `context`. Each item is a map whose keys
/// are substituted into the body; the results are concatenated in order.
/// Trimming strips whitespace only, so a trailing `,` in the body stays.
pub fn expand_loops(view: &str, contents: &str, context: &Context) -> Result<String, TemplateError> {
    if !LOOP_RE.is_match(contents) {
        return Ok(contents.to_string());
    }

    let mut output = String::with_capacity(contents.len());
    let mut last = 0;

    for captures in LOOP_RE.captures_iter(contents) {
        let Some(block) = captures.get(0) else {
            continue;
        };
        let source_name = &captures[1];
        let body = &captures[2];

        let items: Vec<&Value> = match context.get(source_name) {
            None => {
                return Err(TemplateError::MissingLoopSource {
                    view: view.to_string(),
                    source_name: source_name.to_string(),
                });
            }
            Some(Value::Array(items)) => items.iter().collect(),
            Some(Value::Object(items)) => items.values().collect(),
            Some(_) => {
                return Err(TemplateError::InvalidLoopSource {
                    view: view.to_string(),
                    source_name: source_name.to_string(),
                });
            }
        };

        output.push_str(&contents[last..block.start()]);
        for (position, item) in items.into_iter().enumerate() {
            let Value::Object(record) = item else {
                return Err(TemplateError::InvalidLoopRecord {
                    view: view.to_string(),
                    source_name: source_name.to_string(),
                    position,
                });
            };
            output.push_str(&substitute_variables(body, record));
        }
        last = block.end();
    }

    output.push_str(&contents[last..]);
    Ok(output.trim().to_string())
}

/// Replace every `{{ key }}` token with its value from `context`.
///
/// Nested maps are merged into scope (their keys are substituted as if
/// they were top level). Lists are skipped; they only feed loops. Tokens
/// with no value are left in place.
pub fn substitute_variables(contents: &str, context: &Context) -> String {
    let mut output = contents.to_string();

    for (key, value) in context {
        match value {
            Value::Object(nested) => output = substitute_variables(&output, nested),
            Value::Array(_) => {}
            Value::String(s) => output = output.replace(&token(key), s),
            Value::Null => output = output.replace(&token(key), ""),
            other => output = output.replace(&token(key), &other.to_string()),
        }
    }

    output.trim().to_string()
}

fn token(key: &str) -> String {
    format!("{{{{ {} }}}}", key)
}

/// Splice `@include{name}` references. Every view is resolved fully before
/// it is spliced into another. Unknown names and cycles are errors.
pub fn resolve_includes(views: &BTreeMap<String, String>) -> GoCalResult<BTreeMap<String, String>> {
    let mut resolved = HashMap::new();

    for name in views.keys() {
        let mut stack = Vec::new();
        resolve_view(name, views, &mut resolved, &mut stack)?;
    }

    Ok(views
        .keys()
        .map(|name| (name.clone(), resolved[name].clone()))
        .collect())
}

fn resolve_view(
    name: &str,
    views: &BTreeMap<String, String>,
    resolved: &mut HashMap<String, String>,
    stack: &mut Vec<String>,
) -> Result<String, TemplateError> {
    if let Some(done) = resolved.get(name) {
        return Ok(done.clone());
    }

    if let Some(start) = stack.iter().position(|n| n == name) {
        let mut chain = stack[start..].to_vec();
        chain.push(name.to_string());
        return Err(TemplateError::IncludeCycle { chain });
    }

    let mut contents = views[name].clone();
    stack.push(name.to_string());

    let includes: Vec<String> = INCLUDE_RE
        .captures_iter(&views[name])
        .map(|c| c[1].to_string())
        .collect();

    for include in includes {
        if !views.contains_key(&include) {
            return Err(TemplateError::UnknownInclude {
                view: name.to_string(),
                include,
            });
        }
        let replacement = resolve_view(&include, views, resolved, stack)?;
        contents = contents
            .replace(&format!("@include{{{}}}", include), &replacement)
            .trim()
            .to_string();
    }

    stack.pop();
    resolved.insert(name.to_string(), contents.clone());
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(value: Value) -> Context {
        value.as_object().cloned().unwrap()
    }

    fn views(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(name, contents)| (name.to_string(), contents.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_simple_variable() {
        let ctx = context(json!({ "name": "World" }));
        assert_eq!(substitute_variables("Hello {{ name }}", &ctx), "Hello World");
    }

    #[test]
    fn test_substitute_leaves_unknown_tokens() {
        let ctx = context(json!({ "name": "World" }));
        assert_eq!(
            substitute_variables("{{ greeting }} {{ name }}", &ctx),
            "{{ greeting }} World"
        );
    }

    #[test]
    fn test_substitute_merges_nested_maps_into_scope() {
        let ctx = context(json!({ "site": { "title": "GO Calendar", "meta": { "year": 2025 } } }));
        assert_eq!(
            substitute_variables("{{ title }} ({{ year }})", &ctx),
            "GO Calendar (2025)"
        );
    }

    #[test]
    fn test_substitute_requires_exact_token_spacing() {
        let ctx = context(json!({ "name": "World" }));
        assert_eq!(substitute_variables("{{name}}", &ctx), "{{name}}");
    }

    #[test]
    fn test_loop_concatenates_items_in_order() {
        let ctx = context(json!({ "items": [{ "x": "a" }, { "x": "b" }] }));
        let out = expand_loops("index", "@loop{items}{{ x }},@endloop", &ctx).unwrap();
        assert_eq!(out, "a,b,");
    }

    #[test]
    fn test_loop_trims_each_item_and_the_result() {
        let ctx = context(json!({ "items": [{ "x": "a" }, { "x": "b" }] }));
        let template = "\n<ul>\n@loop{items}\n  <li>{{ x }}</li>\n@endloop\n</ul>\n";
        let out = expand_loops("index", template, &ctx).unwrap();
        assert_eq!(out, "<ul>\n<li>a</li><li>b</li>\n</ul>");
    }

    #[test]
    fn test_loop_over_map_uses_values_in_key_order() {
        let ctx = context(json!({
            "calendars": {
                "everything": { "name": "Everything" },
                "raid_battles": { "name": "Raid Battles" }
            }
        }));
        let out = expand_loops("index", "@loop{calendars}[{{ name }}]@endloop", &ctx).unwrap();
        assert_eq!(out, "[Everything][Raid Battles]");
    }

    #[test]
    fn test_multiple_loops_in_one_view() {
        let ctx = context(json!({ "a": [{ "v": "1" }], "b": [{ "v": "2" }, { "v": "3" }] }));
        let out = expand_loops("index", "@loop{a}{{ v }}@endloop|@loop{b}{{ v }}@endloop", &ctx).unwrap();
        assert_eq!(out, "1|23");
    }

    #[test]
    fn test_loop_spans_lines_lazily() {
        let ctx = context(json!({ "a": [{ "v": "x" }] }));
        let template = "@loop{a}\n{{ v }}\n@endloop middle @loop{a}{{ v }}@endloop";
        let out = expand_loops("index", template, &ctx).unwrap();
        assert_eq!(out, "x middle x");
    }

    #[test]
    fn test_loop_with_missing_source_is_an_error() {
        let err = expand_loops("index", "@loop{items}{{ x }}@endloop", &Context::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingLoopSource {
                view: "index".to_string(),
                source_name: "items".to_string()
            }
        );
    }

    #[test]
    fn test_loop_over_scalar_is_an_error() {
        let ctx = context(json!({ "items": "nope" }));
        assert!(matches!(
            expand_loops("index", "@loop{items}{{ x }}@endloop", &ctx),
            Err(TemplateError::InvalidLoopSource { .. })
        ));
    }

    #[test]
    fn test_loop_item_must_be_a_map() {
        let ctx = context(json!({ "items": [{ "x": "a" }, "b"] }));
        assert!(matches!(
            expand_loops("index", "@loop{items}{{ x }}@endloop", &ctx),
            Err(TemplateError::InvalidLoopRecord { position: 1, .. })
        ));
    }

    #[test]
    fn test_view_without_loops_is_untouched() {
        let out = expand_loops("index", "  plain  ", &Context::new()).unwrap();
        assert_eq!(out, "  plain  ");
    }

    #[test]
    fn test_includes_resolve_recursively() {
        let resolved = resolve_includes(&views(&[
            ("index", "<html>@include{body}</html>"),
            ("body", "<body>@include{footer}</body>"),
            ("footer", "<footer/>"),
        ]))
        .unwrap();

        assert_eq!(resolved["index"], "<html><body><footer/></body></html>");
        assert_eq!(resolved["body"], "<body><footer/></body>");
    }

    #[test]
    fn test_include_used_twice_is_replaced_everywhere() {
        let resolved = resolve_includes(&views(&[
            ("index", "@include{hr}text@include{hr}"),
            ("hr", "<hr>"),
        ]))
        .unwrap();
        assert_eq!(resolved["index"], "<hr>text<hr>");
    }

    #[test]
    fn test_include_cycle_is_rejected() {
        let err = resolve_includes(&views(&[
            ("a", "@include{b}"),
            ("b", "@include{c}"),
            ("c", "@include{a}"),
        ]))
        .unwrap_err();

        match err {
            crate::error::GoCalError::Template(TemplateError::IncludeCycle { chain }) => {
                assert_eq!(chain, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected include cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_include_is_rejected() {
        let result = resolve_includes(&views(&[("index", "@include{index}")]));
        assert!(matches!(
            result,
            Err(crate::error::GoCalError::Template(TemplateError::IncludeCycle { .. }))
        ));
    }

    #[test]
    fn test_unknown_include_names_the_view() {
        let err = resolve_includes(&views(&[("index", "@include{nav}")])).unwrap_err();
        match err {
            crate::error::GoCalError::Template(TemplateError::UnknownInclude { view, include }) => {
                assert_eq!(view, "index");
                assert_eq!(include, "nav");
            }
            other => panic!("expected unknown include, got {:?}", other),
        }
    }
}
