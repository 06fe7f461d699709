use std::fmt;

use log::warn;

use crate::error::NativeError;
use crate::framework::util::HashMap;
use crate::painting::image::CanvasImage;
use crate::painting::scene::Scene;
use crate::window::{ResponseHandle, SemanticsUpdate, WindowScope};

type ClosureFn = Box<dyn FnOnce(&mut WindowScope<'_>, NativeValue) + Send>;

/// A callable value handed from the logic context to a native function,
/// invoked at most once.
pub struct NativeClosure(ClosureFn);

impl NativeClosure {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(&mut WindowScope<'_>, NativeValue) + Send + 'static,
    {
        Self(Box::new(callback))
    }

    pub fn call(self, scope: &mut WindowScope<'_>, value: NativeValue) {
        (self.0)(scope, value)
    }
}

/// Values crossing the native-call boundary.
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Scene(Scene),
    Semantics(SemanticsUpdate),
    Image(CanvasImage),
    Closure(NativeClosure),
}

impl NativeValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Null => "null",
            NativeValue::Bool(_) => "bool",
            NativeValue::Int(_) => "int",
            NativeValue::Double(_) => "double",
            NativeValue::String(_) => "string",
            NativeValue::Bytes(_) => "bytes",
            NativeValue::Scene(_) => "scene",
            NativeValue::Semantics(_) => "semantics",
            NativeValue::Image(_) => "image",
            NativeValue::Closure(_) => "closure",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Null => f.write_str("Null"),
            NativeValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            NativeValue::Int(value) => f.debug_tuple("Int").field(value).finish(),
            NativeValue::Double(value) => {
                f.debug_tuple("Double").field(value).finish()
            }
            NativeValue::String(value) => {
                f.debug_tuple("String").field(value).finish()
            }
            NativeValue::Bytes(value) => {
                f.debug_tuple("Bytes").field(&value.len()).finish()
            }
            NativeValue::Scene(scene) => {
                f.debug_tuple("Scene").field(&scene.items().len()).finish()
            }
            NativeValue::Semantics(update) => {
                f.debug_tuple("Semantics").field(&update.nodes.len()).finish()
            }
            NativeValue::Image(image) => f.debug_tuple("Image").field(image).finish(),
            NativeValue::Closure(_) => f.write_str("Closure"),
        }
    }
}

pub type NativeHandler = fn(
    &mut WindowScope<'_>,
    Vec<NativeValue>,
) -> Result<NativeValue, NativeError>;

#[derive(Clone, Copy)]
struct NativeEntry {
    name: &'static str,
    arity: usize,
    handler: NativeHandler,
}

/// Name -> handler table the logic context calls into. Built once when the
/// engine starts and shared by every isolate.
#[derive(Default)]
pub struct NativeTable {
    entries: HashMap<&'static str, NativeEntry>,
}

impl NativeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The window and painting functions every isolate can call.
    pub fn standard() -> Self {
        let mut table = Self::new();
        let builtins: [(&'static str, usize, NativeHandler); 6] = [
            ("Window_scheduleFrame", 0, schedule_frame),
            ("Window_render", 1, render),
            ("Window_updateSemantics", 1, update_semantics),
            ("Window_sendPlatformMessage", 3, send_platform_message),
            ("Window_respondToPlatformMessage", 2, respond_to_platform_message),
            ("decodeImageFromList", 2, decode_image_from_list),
        ];
        for (name, arity, handler) in builtins {
            if let Err(err) = table.register(name, arity, handler) {
                warn!("{}", err);
            }
        }
        table
    }

    pub fn register(
        &mut self,
        name: &'static str,
        arity: usize,
        handler: NativeHandler,
    ) -> Result<(), String> {
        if self.entries.contains_key(name) {
            return Err(format!("native function '{}' already registered", name));
        }
        self.entries.insert(
            name,
            NativeEntry {
                name,
                arity,
                handler,
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names = self.entries.keys().copied().collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub fn call(
        &self,
        name: &str,
        scope: &mut WindowScope<'_>,
        args: Vec<NativeValue>,
    ) -> Result<NativeValue, NativeError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| NativeError::UnknownFunction(name.to_string()))?;

        if args.len() != entry.arity {
            return Err(NativeError::Arity {
                name: entry.name,
                expected: entry.arity,
                got: args.len(),
            });
        }

        (entry.handler)(scope, args)
    }
}

impl fmt::Debug for NativeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeTable")
            .field("names", &self.names())
            .finish()
    }
}

fn type_error(
    what: &str,
    expected: &str,
    value: &NativeValue,
) -> NativeError {
    NativeError::ArgumentType(format!(
        "{} must be {}, got {}",
        what,
        expected,
        value.type_name()
    ))
}

fn schedule_frame(
    scope: &mut WindowScope<'_>,
    _args: Vec<NativeValue>,
) -> Result<NativeValue, NativeError> {
    scope.schedule_frame();
    Ok(NativeValue::Null)
}

fn render(
    scope: &mut WindowScope<'_>,
    args: Vec<NativeValue>,
) -> Result<NativeValue, NativeError> {
    match args.into_iter().next() {
        Some(NativeValue::Scene(scene)) => {
            scope.render(scene);
            Ok(NativeValue::Null)
        }
        other => Err(type_error(
            "Scene",
            "a scene",
            &other.unwrap_or(NativeValue::Null),
        )),
    }
}

fn update_semantics(
    scope: &mut WindowScope<'_>,
    args: Vec<NativeValue>,
) -> Result<NativeValue, NativeError> {
    match args.into_iter().next() {
        Some(NativeValue::Semantics(update)) => {
            scope.update_semantics(update);
            Ok(NativeValue::Null)
        }
        other => Err(type_error(
            "Semantics update",
            "a semantics update",
            &other.unwrap_or(NativeValue::Null),
        )),
    }
}

/// Arguments: channel, reply callback (or null), data (or null).
fn send_platform_message(
    scope: &mut WindowScope<'_>,
    args: Vec<NativeValue>,
) -> Result<NativeValue, NativeError> {
    let [channel, callback, data]: [NativeValue; 3] = args
        .try_into()
        .map_err(|_| NativeError::ArgumentType("expected 3 arguments".into()))?;

    let channel = match channel {
        NativeValue::String(channel) => channel,
        other => return Err(type_error("Channel", "a string", &other)),
    };
    let data = match data {
        NativeValue::Bytes(data) => data,
        NativeValue::Null => Vec::new(),
        other => return Err(type_error("Data", "bytes or null", &other)),
    };

    match callback {
        NativeValue::Null => scope.send_platform_message(channel, data),
        NativeValue::Closure(callback) => {
            scope.send_platform_message_with_reply(
                channel,
                data,
                move |scope, reply| {
                    let value = reply.map_or(NativeValue::Null, NativeValue::Bytes);
                    callback.call(scope, value);
                },
            );
        }
        _ => {
            return Err(NativeError::ArgumentType(
                "Callback must be a function".to_string(),
            ));
        }
    }

    Ok(NativeValue::Null)
}

/// Arguments: response handle, data (or null).
fn respond_to_platform_message(
    scope: &mut WindowScope<'_>,
    args: Vec<NativeValue>,
) -> Result<NativeValue, NativeError> {
    let [handle, data]: [NativeValue; 2] = args
        .try_into()
        .map_err(|_| NativeError::ArgumentType("expected 2 arguments".into()))?;

    let handle = match handle {
        NativeValue::Int(raw) if raw >= 0 => ResponseHandle::from_raw(raw as u64),
        other => return Err(type_error("Response handle", "an int", &other)),
    };
    let data = match data {
        NativeValue::Bytes(data) => data,
        NativeValue::Null => Vec::new(),
        other => return Err(type_error("Data", "bytes or null", &other)),
    };

    scope.respond_to_platform_message(handle, data)?;
    Ok(NativeValue::Null)
}

/// Arguments: encoded bytes, callback receiving an image or null.
fn decode_image_from_list(
    scope: &mut WindowScope<'_>,
    args: Vec<NativeValue>,
) -> Result<NativeValue, NativeError> {
    let [list, callback]: [NativeValue; 2] = args
        .try_into()
        .map_err(|_| NativeError::ArgumentType("expected 2 arguments".into()))?;

    let NativeValue::Closure(callback) = callback else {
        return Err(NativeError::ArgumentType(
            "Callback must be a function".to_string(),
        ));
    };
    let bytes = match list {
        NativeValue::Bytes(bytes) => bytes,
        other => return Err(type_error("Image data", "bytes", &other)),
    };

    scope.decode_image_from_list(bytes, move |scope, image| {
        let value = image.map_or(NativeValue::Null, NativeValue::Image);
        callback.call(scope, value);
    });
    Ok(NativeValue::Null)
}
