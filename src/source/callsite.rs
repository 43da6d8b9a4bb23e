//! Per-line call lookup with append-only memoization.
//!
//! Documents are immutable once parsed, so both query families cache their
//! first answer forever: repeated hits on the same line (loops, hot helpers)
//! cost one hash probe.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::source::ResolveError;
use crate::source::map::{CalleeShape, NodeId, NodePayload, SyntaxMap};

#[derive(Default)]
pub(crate) struct CallSiteCache {
    attribute_calls: RefCell<FxHashMap<usize, FxHashMap<String, Option<NodeId>>>>,
    named_calls: RefCell<FxHashMap<usize, Rc<[NodeId]>>>,
}

impl CallSiteCache {
    /// The unique `object.name(...)` call on `line`.
    ///
    /// Zero such calls is an ordinary answer (`None`): the attribute was
    /// looked up without being invoked on that line. Two or more is an error;
    /// there is no way to tell which one triggered the lookup.
    pub(crate) fn attribute_call_at(
        &self,
        map: &SyntaxMap,
        line: usize,
        name: &str,
    ) -> Result<Option<NodeId>, ResolveError> {
        if let Some(by_name) = self.attribute_calls.borrow().get(&line)
            && let Some(&found) = by_name.get(name)
        {
            return Ok(found);
        }

        let mut found = None;
        let mut candidates = 0;
        for &id in map.line_nodes(line) {
            if let NodePayload::Call(CalleeShape::Attribute(attribute)) = &map.record(id).payload
                && attribute == name
            {
                candidates += 1;
                found.get_or_insert(id);
            }
        }
        if candidates > 1 {
            return Err(ResolveError::AmbiguousCall {
                candidates,
                name: name.to_string(),
                line,
            });
        }

        self.attribute_calls
            .borrow_mut()
            .entry(line)
            .or_default()
            .insert(name.to_string(), found);
        Ok(found)
    }

    /// Calls with bare-identifier callees inside the one statement covering
    /// `line`, in tree order. The statement may extend past the line; its
    /// calls on other lines still count.
    pub(crate) fn named_calls_at(
        &self,
        map: &SyntaxMap,
        line: usize,
    ) -> Result<Rc<[NodeId]>, ResolveError> {
        if let Some(found) = self.named_calls.borrow().get(&line) {
            return Ok(found.clone());
        }

        let nodes = map.line_nodes(line);
        let calls: Rc<[NodeId]> = if nodes.is_empty() {
            Vec::new().into()
        } else {
            let statement = map.enclosing_statement(nodes[0])?;
            for &id in &nodes[1..] {
                if map.enclosing_statement(id)? != statement {
                    return Err(ResolveError::Structure {
                        message: "line spans multiple statements",
                    });
                }
            }
            let mut calls = Vec::new();
            for id in map.ids() {
                if matches!(
                    map.record(id).payload,
                    NodePayload::Call(CalleeShape::Named(_))
                ) && map.enclosing_statement(id)? == statement
                {
                    calls.push(id);
                }
            }
            calls.into()
        };

        self.named_calls.borrow_mut().insert(line, calls.clone());
        Ok(calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;

    fn build(input: &str) -> SyntaxMap {
        let tokens = tokenize(input).expect("tokenize should succeed");
        let program = parse_tokens(tokens).expect("parse should succeed");
        SyntaxMap::build(&program)
    }

    #[test]
    fn finds_single_attribute_call() {
        let map = build("names = scry.assigned_names()\n");
        let cache = CallSiteCache::default();
        let found = cache
            .attribute_call_at(&map, 1, "assigned_names")
            .expect("lookup should succeed")
            .expect("call should be found");
        assert!(matches!(
            &map.record(found).payload,
            NodePayload::Call(CalleeShape::Attribute(name)) if name == "assigned_names"
        ));
    }

    #[test]
    fn reports_absence_as_none() {
        let map = build("alias = scry.target\n");
        let cache = CallSiteCache::default();
        let found = cache
            .attribute_call_at(&map, 1, "target")
            .expect("lookup should succeed");
        assert_eq!(found, None);
        // Cached answer must be identical.
        let again = cache
            .attribute_call_at(&map, 1, "target")
            .expect("lookup should succeed");
        assert_eq!(again, None);
    }

    #[test]
    fn two_matching_attribute_calls_are_ambiguous() {
        let map = build("x = scry.target() + scry.target()\n");
        let cache = CallSiteCache::default();
        let err = cache
            .attribute_call_at(&map, 1, "target")
            .expect_err("expected ambiguity");
        assert_eq!(
            err,
            ResolveError::AmbiguousCall {
                candidates: 2,
                name: "target".to_string(),
                line: 1,
            }
        );
    }

    #[test]
    fn attribute_calls_with_other_names_do_not_collide() {
        let map = build("x = scry.target() + box.refresh()\n");
        let cache = CallSiteCache::default();
        let found = cache
            .attribute_call_at(&map, 1, "target")
            .expect("lookup should succeed");
        assert!(found.is_some());
    }

    #[test]
    fn named_calls_cover_the_whole_statement() {
        let map = build("x = outer(\n    inner())\n");
        let cache = CallSiteCache::default();
        // Query by the second line; the statement starts on the first.
        let calls = cache
            .named_calls_at(&map, 2)
            .expect("lookup should succeed");
        let names: Vec<_> = calls
            .iter()
            .map(|&id| match &map.record(id).payload {
                NodePayload::Call(CalleeShape::Named(name)) => name.clone(),
                other => panic!("unexpected payload {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["outer".to_string(), "inner".to_string()]);
    }

    #[test]
    fn named_calls_skip_attribute_callees() {
        let map = build("x = scry.target()\n");
        let cache = CallSiteCache::default();
        let calls = cache
            .named_calls_at(&map, 1)
            .expect("lookup should succeed");
        assert!(calls.is_empty());
    }

    #[test]
    fn empty_line_yields_no_candidates() {
        let map = build("x = f()\n");
        let cache = CallSiteCache::default();
        let calls = cache
            .named_calls_at(&map, 7)
            .expect("lookup should succeed");
        assert!(calls.is_empty());
    }

    #[test]
    fn named_calls_memoize_per_line() {
        let map = build("x = f(g())\n");
        let cache = CallSiteCache::default();
        let first = cache
            .named_calls_at(&map, 1)
            .expect("lookup should succeed");
        let second = cache
            .named_calls_at(&map, 1)
            .expect("lookup should succeed");
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
    }
}
