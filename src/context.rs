use std::rc::Rc;

use crate::position::Span;

/// One record in the call chain used to render tracebacks. This is
/// deliberately separate from the scope chain: it is never consulted for
/// name resolution, only walked when a runtime error is constructed.
#[derive(Debug)]
pub struct CallContext {
    pub name: String,
    pub parent: Option<Rc<CallContext>>,
    /// Span of the call expression that entered this context. `None` only
    /// for the root context.
    pub call_site: Option<Span>,
}

impl CallContext {
    pub fn root(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            parent: None,
            call_site: None,
        })
    }

    pub fn child(parent: &Rc<Self>, name: impl Into<String>, call_site: Span) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            parent: Some(parent.clone()),
            call_site: Some(call_site),
        })
    }
}
