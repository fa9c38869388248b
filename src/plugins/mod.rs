//! Capability adapters for scraper and generator plugins.
//!
//! A plugin declares which named arguments it accepts through a [`Signature`].
//! Callers pass a generic option bag; [`invoke`] trims it down to what the plugin
//! declared so a broader option set never turns into a hard failure.

pub mod builtin;
pub mod html;

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::Result;

/// Named arguments for a capability call, in caller order
pub type CallArgs = Map<String, Value>;

/// Parameters a capability accepts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<String>,
    accepts_any: bool,
}

/// Result of matching caller arguments against a [`Signature`]
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredArgs {
    pub kept: CallArgs,
    pub dropped: Vec<String>,
}

impl Signature {
    pub fn named<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            accepts_any: false,
        }
    }

    /// Accepts arbitrary extra named arguments
    pub fn any() -> Self {
        Self {
            params: Vec::new(),
            accepts_any: true,
        }
    }

    /// Declared parameters plus arbitrary extras
    pub fn with_extra(mut self) -> Self {
        self.accepts_any = true;
        self
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.accepts_any || self.params.iter().any(|p| p == name)
    }

    /// Signature accepting everything either side accepts
    pub fn union(&self, other: &Signature) -> Signature {
        let mut params = self.params.clone();
        for p in &other.params {
            if !params.contains(p) {
                params.push(p.clone());
            }
        }
        Signature {
            params,
            accepts_any: self.accepts_any || other.accepts_any,
        }
    }

    pub fn filter(&self, args: &CallArgs) -> FilteredArgs {
        if self.accepts_any {
            return FilteredArgs {
                kept: args.clone(),
                dropped: Vec::new(),
            };
        }
        let mut kept = CallArgs::new();
        let mut dropped = Vec::new();
        for (name, value) in args {
            if self.accepts(name) {
                kept.insert(name.clone(), value.clone());
            } else {
                dropped.push(name.clone());
            }
        }
        FilteredArgs { kept, dropped }
    }
}

/// Something the pipeline can call with named arguments
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn signature(&self) -> &Signature;
    /// Receives only arguments accepted by [`Capability::signature`] when called via [`invoke`].
    fn call(&self, args: CallArgs) -> Result<Value>;
}

/// Call `capability` with the subset of `args` it declares.
///
/// Undeclared arguments are dropped with a warning rather than rejected, so a
/// misspelled option is visible in the logs but does not fail the run.
pub fn invoke(capability: &dyn Capability, args: &CallArgs) -> Result<Value> {
    let FilteredArgs { kept, dropped } = capability.signature().filter(args);
    if !dropped.is_empty() {
        warn!(
            "Dropping arguments not accepted by '{}': {}",
            capability.name(),
            dropped.join(", ")
        );
    }
    capability.call(kept)
}

type CallFn = dyn Fn(CallArgs) -> Result<Value> + Send + Sync;

/// A bare callable registered under a name
pub struct FnCapability {
    name: String,
    signature: Signature,
    func: Box<CallFn>,
}

impl FnCapability {
    pub fn new<F>(name: impl Into<String>, signature: Signature, func: F) -> Self
    where
        F: Fn(CallArgs) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            func: Box::new(func),
        }
    }
}

impl Capability for FnCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, args: CallArgs) -> Result<Value> {
        (self.func)(args)
    }
}

/// A constructed plugin object
pub trait PluginInstance {
    fn call_method(&self, method: &str, args: CallArgs) -> Result<Value>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpec {
    pub name: String,
    pub signature: Signature,
}

type BuildFn = dyn Fn(CallArgs) -> Result<Box<dyn PluginInstance>> + Send + Sync;

/// An instantiable plugin type: built from constructor arguments, then one of its
/// methods is called
pub struct PluginType {
    name: String,
    constructor: Signature,
    methods: Vec<MethodSpec>,
    build: Box<BuildFn>,
}

impl PluginType {
    pub fn new<F>(name: impl Into<String>, constructor: Signature, build: F) -> Self
    where
        F: Fn(CallArgs) -> Result<Box<dyn PluginInstance>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            constructor,
            methods: Vec::new(),
            build: Box::new(build),
        }
    }

    pub fn with_method(mut self, name: impl Into<String>, signature: Signature) -> Self {
        self.methods.push(MethodSpec {
            name: name.into(),
            signature,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Bind `method` into a capability that constructs a fresh instance per call
    pub fn bind(self: &Arc<Self>, method: &str) -> Option<BoundMethod> {
        let spec = self.method(method)?.clone();
        Some(BoundMethod {
            label: format!("{}.{}", self.name, spec.name),
            signature: self.constructor.union(&spec.signature),
            ty: Arc::clone(self),
            method: spec,
        })
    }
}

/// A [`PluginType`] method exposed as a [`Capability`]
pub struct BoundMethod {
    label: String,
    signature: Signature,
    ty: Arc<PluginType>,
    method: MethodSpec,
}

impl Capability for BoundMethod {
    fn name(&self) -> &str {
        &self.label
    }

    /// Union of constructor and method parameters; each side is filtered again on call
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, args: CallArgs) -> Result<Value> {
        let ctor_args = self.ty.constructor.filter(&args).kept;
        let method_args = self.method.signature.filter(&args).kept;
        let instance = (self.ty.build)(ctor_args)?;
        instance.call_method(&self.method.name, method_args)
    }
}

/// Read a required string argument
pub fn required_str<'a>(args: &'a CallArgs, key: &str, plugin: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| crate::error::PipelineError::plugin(plugin, format!("{} is required", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn args(pairs: Value) -> CallArgs {
        pairs.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_drops_undeclared() {
        let sig = Signature::named(["url"]);
        let filtered = sig.filter(&args(json!({"url": "a", "mode": "sentiment"})));
        assert_eq!(filtered.kept, args(json!({"url": "a"})));
        assert_eq!(filtered.dropped, vec!["mode".to_string()]);
    }

    #[test]
    fn test_filter_keeps_everything_for_var_kwargs() {
        let sig = Signature::named(["url"]).with_extra();
        let input = args(json!({"url": "a", "depth": 2}));
        let filtered = sig.filter(&input);
        assert_eq!(filtered.kept, input);
        assert!(filtered.dropped.is_empty());
    }

    #[test]
    fn test_invoke_delivers_only_declared_args() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in = Arc::clone(&seen);
        let cap = FnCapability::new("scrape", Signature::named(["url"]), move |a| {
            *seen_in.lock().unwrap() = Some(a);
            Ok(json!("page"))
        });
        let out = invoke(&cap, &args(json!({"url": "a", "mode": "sentiment"}))).unwrap();
        assert_eq!(out, json!("page"));
        assert_eq!(seen.lock().unwrap().clone().unwrap(), args(json!({"url": "a"})));
    }

    struct Echo {
        prefix: String,
    }

    impl PluginInstance for Echo {
        fn call_method(&self, _method: &str, args: CallArgs) -> Result<Value> {
            let url = args.get("url").and_then(Value::as_str).unwrap_or("-");
            Ok(json!(format!("{}{}", self.prefix, url)))
        }
    }

    #[test]
    fn test_bound_method_splits_constructor_and_method_args() {
        let ty = Arc::new(
            PluginType::new("Scraper", Signature::named(["prefix"]), |a| {
                let prefix = a.get("prefix").and_then(Value::as_str).unwrap_or("").to_string();
                assert!(!a.contains_key("url"));
                Ok(Box::new(Echo { prefix }) as Box<dyn PluginInstance>)
            })
            .with_method("run", Signature::named(["url"])),
        );
        let bound = ty.bind("run").unwrap();
        assert_eq!(bound.name(), "Scraper.run");
        assert!(bound.signature().accepts("prefix"));
        assert!(bound.signature().accepts("url"));
        assert!(ty.bind("missing").is_none());

        let out = invoke(&bound, &args(json!({"prefix": ">", "url": "x", "mode": "m"}))).unwrap();
        assert_eq!(out, json!(">x"));
    }

    #[test]
    fn test_required_str() {
        let a = args(json!({"url": 3}));
        let err = required_str(&a, "url", "scrape").unwrap_err();
        assert_eq!(err.to_string(), "Plugin 'scrape' failed: url is required");
    }
}
