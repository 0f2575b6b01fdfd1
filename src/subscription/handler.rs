use std::fmt;
use std::sync::Arc;

/// Callback invoked with `(group, id, content)` whenever a value is observed
pub type Handler = Arc<dyn Fn(&str, &str, &str) + Send + Sync>;

/// Named callbacks that subscription declarations refer to by name.
///
/// Names are compared case-insensitively. When the same name is registered
/// twice the earlier registration wins.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<(String, Handler)>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(&str, &str, &str) + Send + Sync + 'static,
    {
        self.handlers.push((name.into(), Arc::new(handler)));
        self
    }

    pub fn with_handler<F>(
        mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(&str, &str, &str) + Send + Sync + 'static,
    {
        self.register(name, handler);
        self
    }

    pub fn resolve(
        &self,
        name: &str,
    ) -> Option<Handler> {
        self.handlers
            .iter()
            .find(|(registered, _)| registered.eq_ignore_ascii_case(name))
            .map(|(_, handler)| handler.clone())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|(name, _)| name))
            .finish()
    }
}
