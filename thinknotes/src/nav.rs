use parking_lot::Mutex;
use tracing::debug;

/// Route paths
pub mod routes {
    pub const LANDING: &str = "/";
    pub const SIGN_IN: &str = "/signin";
    pub const SIGN_UP: &str = "/signup";
    pub const DASHBOARD: &str = "/dashboard";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one
    pub replace: bool,
}

impl NavigateOptions {
    pub fn push() -> Self {
        Self { replace: false }
    }

    pub fn replace() -> Self {
        Self { replace: true }
    }
}

/// Something that can move the user to another view
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str, options: NavigateOptions);
}

#[derive(Debug)]
struct Stack {
    entries: Vec<String>,
    index: usize,
}

/// In-memory navigation history with browser back-button semantics.
#[derive(Debug)]
pub struct History {
    stack: Mutex<Stack>,
}

impl History {
    /// Start at `initial` with no back entries.
    pub fn new(initial: &str) -> Self {
        Self {
            stack: Mutex::new(Stack {
                entries: vec![initial.to_string()],
                index: 0,
            }),
        }
    }

    /// Path of the current entry
    pub fn current(&self) -> String {
        let stack = self.stack.lock();
        stack.entries[stack.index].clone()
    }

    /// Step back one entry. Returns the new current path, or `None` at the start.
    pub fn back(&self) -> Option<String> {
        let mut stack = self.stack.lock();
        if stack.index == 0 {
            return None;
        }
        stack.index -= 1;
        Some(stack.entries[stack.index].clone())
    }

    /// Entries up to and including the current one
    pub fn entries(&self) -> Vec<String> {
        let stack = self.stack.lock();
        stack.entries[..=stack.index].to_vec()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(routes::LANDING)
    }
}

impl Navigator for History {
    fn navigate(&self, path: &str, options: NavigateOptions) {
        let mut stack = self.stack.lock();
        if options.replace {
            let index = stack.index;
            stack.entries[index] = path.to_string();
        } else {
            let next = stack.index + 1;
            stack.entries.truncate(next);
            stack.entries.push(path.to_string());
            stack.index = next;
        }
        debug!(path, replace = options.replace, "navigated");
    }
}
