//! Tree-walking executor.
//!
//! An [`Executor`] holds only configuration; every call to
//! [`Executor::render`] builds a fresh render pass with its own loop-variable
//! [`MultiStack`] and echo value stack, so one parsed tree can be rendered by
//! several threads at once.

use std::cmp::Ordering;
use std::io;

use thiserror::Error;

use crate::config::EngineConfig;
use super::{
    builtins::{call_builtin, BuiltinError},
    context::{OutputSink, VarContext},
    element::Element,
    multistack::{EmptyStackError, MultiStack},
    node::{walk, ForLoop, Node, Visitor},
    value::{Value, ValueError},
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{context}: {source}")]
    Value {
        context: String,
        #[source]
        source: ValueError,
    },

    #[error("{context}: {source}")]
    Builtin {
        context: String,
        #[source]
        source: BuiltinError,
    },

    #[error(transparent)]
    EmptyStack(#[from] EmptyStackError),

    #[error("{context}: unknown function `@{name}`")]
    UnknownFunction { name: String, context: String },

    #[error("{context}: unknown variable `{name}`")]
    UnknownVariable { name: String, context: String },

    #[error("{context}: {what} needs {needed} value(s) on the stack, found {found}")]
    StackUnderflow {
        what: String,
        needed: usize,
        found: usize,
        context: String,
    },

    #[error("{context}: expected exactly one value left on the stack, found {found}")]
    StackImbalance { found: usize, context: String },

    #[error("{context}: more than {limit} iterations")]
    IterationLimit { limit: u64, context: String },

    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// Renders parsed trees under a fixed [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: EngineConfig,
}

impl Executor {
    pub fn new(config: EngineConfig) -> Self {
        Executor { config }
    }

    /// Render `tree` into `sink`, resolving non-loop variables via `ctx`.
    ///
    /// Output written before a failure stays in the sink.
    pub fn render(
        &self,
        tree: &Node,
        sink: &mut dyn OutputSink,
        ctx: &dyn VarContext,
    ) -> Result<(), RenderError> {
        log::debug!("render pass started");
        let mut pass = RenderPass {
            config: &self.config,
            sink,
            ctx,
            vars: MultiStack::new(),
            stack: Vec::new(),
        };
        tree.accept(&mut pass)?;
        log::debug!("render pass finished");
        Ok(())
    }
}

/// State for one traversal of one tree.
struct RenderPass<'a> {
    config: &'a EngineConfig,
    sink: &'a mut dyn OutputSink,
    ctx: &'a dyn VarContext,
    vars: MultiStack,
    stack: Vec<Value>,
}

impl RenderPass<'_> {
    /// Loop variables first (innermost binding wins), then the context.
    fn lookup(&self, name: &str, context: impl FnOnce() -> String) -> Result<Value, RenderError> {
        if let Ok(v) = self.vars.peek(name) {
            return Ok(v.clone());
        }
        match self.ctx.resolve(name) {
            Some(v) => Ok(v),
            None if self.config.strict_variables => Err(RenderError::UnknownVariable {
                name: name.to_owned(),
                context: context(),
            }),
            None => Ok(Value::Null),
        }
    }

    /// Evaluate a `FOR` bound to a number.
    fn bound(&self, element: &Element, node: &ForLoop) -> Result<Value, RenderError> {
        let raw = match element {
            Element::Variable(name) => self.lookup(name, || for_context(node))?,
            other => other.constant_value().unwrap_or_default(),
        };
        raw.to_number().map_err(|source| RenderError::Value { context: for_context(node), source })
    }

    fn run_loop(&mut self, node: &ForLoop, end: &Value, step: &Value) -> Result<(), RenderError> {
        let value_err = |source| RenderError::Value { context: for_context(node), source };
        let mut iterations: u64 = 0;
        loop {
            let current = self.vars.peek(&node.variable)?;
            if current.num_compare(end).map_err(value_err)? == Ordering::Greater {
                return Ok(());
            }
            if iterations >= self.config.max_iterations {
                return Err(RenderError::IterationLimit {
                    limit: self.config.max_iterations,
                    context: for_context(node),
                });
            }
            iterations += 1;
            log::trace!("FOR {} = {} (iteration {iterations})", node.variable, current);

            walk(self, &node.children)?;

            let top = self.vars.peek_mut(&node.variable)?;
            let next = match (&*top, step) {
                // Stepping past i64::MAX ends the loop instead of wrapping.
                (Value::Int(a), Value::Int(b)) => match a.checked_add(*b) {
                    Some(n) => Value::Int(n),
                    None => return Ok(()),
                },
                _ => top.arith_add(step).map_err(value_err)?,
            };
            *top = next;
        }
    }

    fn apply_element(&mut self, element: &Element, elements: &[Element]) -> Result<(), RenderError> {
        match element {
            Element::Variable(name) => {
                let v = self.lookup(name, || echo_context(elements))?;
                self.stack.push(v);
            }
            Element::Operator(op) => {
                let found = self.stack.len();
                let (Some(rhs), Some(lhs)) = (self.stack.pop(), self.stack.pop()) else {
                    return Err(RenderError::StackUnderflow {
                        what: format!("operator `{}`", op.symbol()),
                        needed: 2,
                        found,
                        context: echo_context(elements),
                    });
                };
                let result = lhs
                    .apply(*op, &rhs)
                    .map_err(|source| RenderError::Value { context: echo_context(elements), source })?;
                self.stack.push(result);
            }
            Element::Function(name) => match call_builtin(name, &mut self.stack, self.ctx) {
                None => {
                    return Err(RenderError::UnknownFunction {
                        name: name.clone(),
                        context: echo_context(elements),
                    })
                }
                Some(Err(BuiltinError::Underflow { name, needed, found })) => {
                    return Err(RenderError::StackUnderflow {
                        what: format!("@{name}"),
                        needed,
                        found,
                        context: echo_context(elements),
                    })
                }
                Some(Err(source)) => {
                    return Err(RenderError::Builtin { context: echo_context(elements), source })
                }
                Some(Ok(())) => {}
            },
            constant => self.stack.push(constant.constant_value().unwrap_or_default()),
        }
        Ok(())
    }
}

impl Visitor for RenderPass<'_> {
    type Error = RenderError;

    fn visit_text(&mut self, text: &str) -> Result<(), RenderError> {
        Ok(self.sink.write(text)?)
    }

    fn visit_for_loop(&mut self, node: &ForLoop) -> Result<(), RenderError> {
        let start = self.bound(&node.start, node)?;
        let end = self.bound(&node.end, node)?;
        let step = match &node.step {
            Some(step) => self.bound(step, node)?,
            None => Value::Int(1),
        };

        self.vars.push(node.variable.as_str(), start);
        let result = self.run_loop(node, &end, &step);
        // Pop exactly once per push, whether or not the body failed.
        self.vars.pop(&node.variable)?;
        result
    }

    fn visit_echo(&mut self, elements: &[Element]) -> Result<(), RenderError> {
        self.stack.clear();
        for element in elements {
            self.apply_element(element, elements)?;
        }
        if self.stack.len() != 1 {
            return Err(RenderError::StackImbalance {
                found: self.stack.len(),
                context: echo_context(elements),
            });
        }
        let value = self.stack.pop().unwrap_or_default();
        Ok(self.sink.write(&value.to_string())?)
    }
}

fn for_context(node: &ForLoop) -> String {
    let mut header = format!("{{$ FOR {} {} {}", node.variable, node.start.as_text(), node.end.as_text());
    if let Some(step) = &node.step {
        header.push(' ');
        header.push_str(&step.as_text());
    }
    header.push_str(" $}");
    header
}

fn echo_context(elements: &[Element]) -> String {
    Node::Echo(elements.to_vec()).to_source()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::script::context::EmptyContext;
    use crate::script::parser::parse;

    fn render_with(src: &str, config: EngineConfig, ctx: &dyn VarContext) -> Result<String, RenderError> {
        let tree = parse(src).unwrap();
        let mut out = String::new();
        Executor::new(config).render(&tree, &mut out, ctx)?;
        Ok(out)
    }

    fn render(src: &str) -> Result<String, RenderError> {
        render_with(src, EngineConfig::default(), &EmptyContext)
    }

    #[test]
    fn text_is_written_verbatim() {
        assert_eq!(render("a\nb  c").unwrap(), "a\nb  c");
    }

    #[test]
    fn echo_is_postfix_left_to_right() {
        assert_eq!(render("{$= 1 2 + 3 * $}").unwrap(), "9");
        assert_eq!(render("{$= 10 4 - 2 / $}").unwrap(), "3");
        assert_eq!(render("{$= \"2\" 0.5 * $}").unwrap(), "1.0");
        assert_eq!(render("{$= 2 3 ^ $}").unwrap(), "8");
    }

    #[test]
    fn echo_prints_strings_raw() {
        assert_eq!(render("{$= \"a\\tb\" $}").unwrap(), "a\tb");
    }

    #[test]
    fn loop_steps_and_stops() {
        assert_eq!(render("{$FOR i 1 5 2$}{$= i $},{$END$}").unwrap(), "1,3,5,");
        assert_eq!(render("{$FOR i 1 3$}{$= i $}{$END$}").unwrap(), "123");
        assert_eq!(render("{$FOR i 0 1 0.5$}{$= i $} {$END$}").unwrap(), "0 0.5 1.0 ");
    }

    #[test]
    fn loop_with_start_past_end_runs_zero_times() {
        assert_eq!(render("a{$FOR i 5 1$}x{$END$}b").unwrap(), "ab");
    }

    #[test]
    fn nested_loops_shadow_and_restore() {
        let out = render("{$FOR i 1 2$}{$FOR i 10 11$}{$= i $} {$END$}{$= i $};{$END$}").unwrap();
        assert_eq!(out, "10 11 1;10 11 2;");
    }

    #[test]
    fn loop_variable_is_gone_after_the_loop() {
        let mut vars = HashMap::new();
        vars.insert("i".to_owned(), Value::Str("outside".into()));
        let out = render_with("{$FOR i 1 2$}{$= i $}{$END$}|{$= i $}", EngineConfig::default(), &vars).unwrap();
        assert_eq!(out, "12|outside");
    }

    #[test]
    fn bounds_come_from_context_and_strings() {
        let mut vars = HashMap::new();
        vars.insert("n".to_owned(), Value::Str("3".into()));
        let out = render_with("{$FOR i \"1\" n$}{$= i $}{$END$}", EngineConfig::default(), &vars).unwrap();
        assert_eq!(out, "123");
    }

    #[test]
    fn non_numeric_bound_is_a_value_error() {
        let mut vars = HashMap::new();
        vars.insert("n".to_owned(), Value::Str("many".into()));
        let err = render_with("{$FOR i 1 n$}{$END$}", EngineConfig::default(), &vars).unwrap_err();
        assert!(matches!(err, RenderError::Value { source: ValueError::Format(_), .. }));
        assert!(err.to_string().starts_with("{$ FOR i 1 n $}"));
    }

    #[test]
    fn zero_step_hits_the_iteration_ceiling() {
        let config = EngineConfig { max_iterations: 5, ..EngineConfig::default() };
        let err = render_with("{$FOR i 1 2 0$}x{$END$}", config, &EmptyContext).unwrap_err();
        assert!(matches!(err, RenderError::IterationLimit { limit: 5, .. }));
    }

    #[test]
    fn loop_ending_at_i64_max_stops_without_wrapping() {
        let out = render("{$FOR i 9223372036854775806 9223372036854775807$}{$= i $};{$END$}").unwrap();
        assert_eq!(out, "9223372036854775806;9223372036854775807;");
    }

    #[test]
    fn ceiling_allows_exactly_max_iterations() {
        let config = EngineConfig { max_iterations: 3, ..EngineConfig::default() };
        assert_eq!(render_with("{$FOR i 1 3$}{$= i $}{$END$}", config, &EmptyContext).unwrap(), "123");
    }

    #[test]
    fn divide_by_zero_keeps_partial_output() {
        let tree = parse("before {$= 4 0 / $} after").unwrap();
        let mut out = String::new();
        let err = Executor::default().render(&tree, &mut out, &EmptyContext).unwrap_err();
        assert!(matches!(err, RenderError::Value { source: ValueError::Arithmetic(_), .. }));
        assert_eq!(out, "before ");
    }

    #[test]
    fn echo_stack_must_end_with_one_value() {
        assert!(matches!(render("{$= 1 2 $}"), Err(RenderError::StackImbalance { found: 2, .. })));
        assert!(matches!(render("{$= $}"), Err(RenderError::StackImbalance { found: 0, .. })));
    }

    #[test]
    fn operator_underflow() {
        assert!(matches!(
            render("{$= 1 + $}"),
            Err(RenderError::StackUnderflow { needed: 2, found: 1, .. })
        ));
        assert!(matches!(
            render("{$= @swap $}"),
            Err(RenderError::StackUnderflow { needed: 2, found: 0, .. })
        ));
    }

    #[test]
    fn functions() {
        assert_eq!(render("{$= 3 @dup * $}").unwrap(), "9");
        assert_eq!(render("{$= 1 2 @swap - $}").unwrap(), "1");
        assert_eq!(render("{$= 30 @sin \"0.000\" @decfmt $}").unwrap(), "0.500");
        assert!(matches!(render("{$= 1 @nope $}"), Err(RenderError::UnknownFunction { .. })));
    }

    #[test]
    fn param_get_reads_the_context() {
        let mut vars = HashMap::new();
        vars.insert("a".to_owned(), Value::Int(4));
        let out = render_with("{$= \"a\" 0 @paramGet \"b\" 5 @paramGet + $}", EngineConfig::default(), &vars);
        assert_eq!(out.unwrap(), "9");
    }

    #[test]
    fn unknown_variables_are_null_unless_strict() {
        assert_eq!(render("[{$= x $}][{$= x 1 + $}]").unwrap(), "[][1]");
        let config = EngineConfig { strict_variables: true, ..EngineConfig::default() };
        let err = render_with("{$= x $}", config, &EmptyContext).unwrap_err();
        assert!(matches!(err, RenderError::UnknownVariable { name, .. } if name == "x"));
    }

    #[test]
    fn failing_body_still_pops_the_loop_variable() {
        // The error surfaces from the body, not as an empty-stack failure.
        let err = render("{$FOR i 1 3$}{$= i 0 / $}{$END$}").unwrap_err();
        assert!(matches!(err, RenderError::Value { .. }));
    }

    #[test]
    fn one_tree_many_threads() {
        let tree = parse("{$FOR i 1 50$}{$= i i * $} {$END$}").unwrap();
        let expected: String = (1..=50).map(|i: i64| format!("{} ", i * i)).collect();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let mut out = String::new();
                    Executor::default().render(&tree, &mut out, &EmptyContext).unwrap();
                    assert_eq!(out, expected);
                });
            }
        });
    }
}
