//! In-process JavaScript runner backed by an embedded engine.
//!
//! The script only sees a narrow host surface: `console.log/info/debug/error/warn`
//! writing into the capture buffer, and `prompt()` pulling from the request's stdin.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsError, JsResult, JsString, JsValue, NativeFunction, Source};

use super::Runner;
use crate::error::RunnerError;
use crate::execution::capture::{Channel, OutputCapture};
use crate::execution::stdin::StdinCursor;
use crate::execution::{ErrorDetail, ExecutionRequest, RunOutcome};

pub struct ScriptRunner;

#[async_trait]
impl Runner for ScriptRunner {
    fn name(&self) -> &'static str {
        "script"
    }

    async fn run(&self, request: &ExecutionRequest) -> Result<RunOutcome, RunnerError> {
        let source = request.source.clone();
        let cursor = StdinCursor::new(request.stdin.clone());
        // The engine context is not `Send`; it lives and dies on the blocking thread.
        tokio::task::spawn_blocking(move || evaluate(&source, cursor))
            .await
            .map_err(|e| RunnerError::Fault(format!("script engine stopped: {e}")))?
    }
}

type Shared<T> = Rc<RefCell<T>>;

/// Evaluates `source` in a fresh engine context.
pub fn evaluate(source: &str, cursor: StdinCursor) -> Result<RunOutcome, RunnerError> {
    let capture: Shared<OutputCapture> = Rc::new(RefCell::new(OutputCapture::new()));
    let cursor: Shared<StdinCursor> = Rc::new(RefCell::new(cursor));

    let mut context = Context::default();
    install_host(&mut context, &capture, &cursor)
        .map_err(|e| RunnerError::setup(format!("failed to prepare script engine: {e}")))?;

    let evaluated = context.eval(Source::from_bytes(source));
    let outcome = match evaluated {
        Ok(value) => {
            let return_preview = if value.is_undefined() {
                None
            } else {
                Some(render_value(&value, &mut context))
            };
            let mut capture = capture.take();
            if let Some(text) = &return_preview {
                capture.push(Channel::Return, text);
            }
            RunOutcome { return_preview, ..capture.success(cursor.borrow().position()) }
        }
        Err(err) => {
            let detail = describe_error(&err, &mut context);
            capture.take().runtime_error(detail, cursor.borrow().position())
        }
    };
    Ok(outcome)
}

fn install_host(
    context: &mut Context,
    capture: &Shared<OutputCapture>,
    cursor: &Shared<StdinCursor>,
) -> JsResult<()> {
    let console = ObjectInitializer::new(context)
        .function(channel_fn(capture, Channel::Info), js_string!("log"), 0)
        .function(channel_fn(capture, Channel::Info), js_string!("info"), 0)
        .function(channel_fn(capture, Channel::Info), js_string!("debug"), 0)
        .function(channel_fn(capture, Channel::Error), js_string!("error"), 0)
        .function(channel_fn(capture, Channel::Warning), js_string!("warn"), 0)
        .build();
    context.register_global_property(js_string!("console"), console, Attribute::all())?;
    context.register_global_callable(js_string!("prompt"), 1, prompt_fn(capture, cursor))?;
    Ok(())
}

fn channel_fn(capture: &Shared<OutputCapture>, channel: Channel) -> NativeFunction {
    let capture = Rc::clone(capture);
    // SAFETY: the closure only captures host-side `Rc` state, never engine-managed values.
    unsafe {
        NativeFunction::from_closure(move |_this, args, context| {
            let parts: Vec<String> = args
                .iter()
                .map(|arg| match channel {
                    Channel::Info => render_value(arg, context),
                    _ => display_value(arg, context),
                })
                .collect();
            capture.borrow_mut().push(channel, &parts.join(" "));
            Ok(JsValue::undefined())
        })
    }
}

fn prompt_fn(capture: &Shared<OutputCapture>, cursor: &Shared<StdinCursor>) -> NativeFunction {
    let capture = Rc::clone(capture);
    let cursor = Rc::clone(cursor);
    // SAFETY: as above, only host-side `Rc` state is captured.
    unsafe {
        NativeFunction::from_closure(move |_this, args, context| {
            let label = match args.first() {
                Some(v) if !(v.is_undefined() || v.is_null()) => display_value(v, context),
                _ => String::new(),
            };
            let Some(line) = cursor.borrow_mut().next_line() else {
                return Ok(JsValue::null());
            };
            capture.borrow_mut().push(Channel::Input, &format!("{label}{line}"));
            Ok(JsValue::from(JsString::from(line.as_str())))
        })
    }
}

/// Objects as pretty JSON, everything else as its string conversion.
fn render_value(value: &JsValue, context: &mut Context) -> String {
    if value.is_object() {
        if let Ok(json) = value.to_json(context) {
            if let Ok(text) = serde_json::to_string_pretty(&json) {
                return text;
            }
        }
    }
    display_value(value, context)
}

fn display_value(value: &JsValue, context: &mut Context) -> String {
    match value.to_string(context) {
        Ok(s) => s.to_std_string_escaped(),
        Err(_) => value.display().to_string(),
    }
}

fn describe_error(err: &JsError, context: &mut Context) -> ErrorDetail {
    let message = match err.try_native(context) {
        Ok(native) => native.to_string(),
        Err(_) => err.to_string(),
    };

    let mut trace = None;
    if let Some(object) = err.as_opaque().and_then(|v| v.as_object()) {
        if let Ok(stack) = object.get(js_string!("stack"), context) {
            if !stack.is_undefined() {
                trace = Some(display_value(&stack, context));
            }
        }
    }

    ErrorDetail::new(message).with_trace(trace)
}
