// provenance.rs — Call chains: where a load request comes from.
//
// Rust has no portable way to ask "which source file is each frame on the
// stack from?", so provenance is explicit. Code that acts on behalf of a
// component enters a frame for that component's origin; the frame stays
// on a thread-local stack until its guard is dropped. A load request then
// captures the stack as a `CallChain`.
//
// Callers that already know their provenance (e.g. a plugin host passing
// the plugin's manifest path) can build a `CallChain` directly instead.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

thread_local! {
    // Outermost first (push order). `CallChain::capture` reverses it.
    static FRAMES: RefCell<Vec<CallerFrame>> = const { RefCell::new(Vec::new()) };
}

/// One entry of a call chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallerFrame {
    /// The file path the frame's code originates from.
    pub origin: PathBuf,
    /// Optional human-readable name (function or component), for logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CallerFrame {
    pub fn new(origin: impl Into<PathBuf>) -> Self {
        Self {
            origin: origin.into(),
            label: None,
        }
    }

    pub fn labeled(origin: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            label: Some(label.into()),
        }
    }
}

/// The frames active at the moment of a load request, innermost first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallChain {
    frames: Vec<CallerFrame>,
}

impl CallChain {
    /// An empty chain; restricted loads from it are always denied.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot the current thread's frame stack.
    pub fn capture() -> Self {
        let frames = FRAMES.with(|stack| stack.borrow().iter().rev().cloned().collect());
        Self { frames }
    }

    /// Build a chain from origin paths, innermost first.
    pub fn from_origins<I, P>(origins: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            frames: origins.into_iter().map(CallerFrame::new).collect(),
        }
    }

    /// Build a chain from frames, innermost first.
    pub fn from_frames(frames: Vec<CallerFrame>) -> Self {
        Self { frames }
    }

    /// Add a frame that is more deeply nested than every existing one.
    pub fn with_innermost(mut self, frame: CallerFrame) -> Self {
        self.frames.insert(0, frame);
        self
    }

    pub fn frames(&self) -> &[CallerFrame] {
        &self.frames
    }

    pub fn origins(&self) -> impl Iterator<Item = &Path> {
        self.frames.iter().map(|f| f.origin.as_path())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Keeps a frame on the thread-local stack until dropped.
///
/// Not `Send`: the frame belongs to the thread that entered it.
#[must_use = "the frame is popped as soon as the guard is dropped"]
pub struct FrameGuard {
    depth: usize,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        // Truncate rather than pop so guards dropped out of order still
        // leave the stack consistent.
        FRAMES.with(|stack| stack.borrow_mut().truncate(self.depth));
    }
}

/// Push a frame originating from `origin` onto this thread's stack.
pub fn enter_frame(origin: impl Into<PathBuf>) -> FrameGuard {
    push(CallerFrame::new(origin))
}

/// Like [`enter_frame`], with a label shown in logs and traces.
pub fn enter_labeled_frame(origin: impl Into<PathBuf>, label: impl Into<String>) -> FrameGuard {
    push(CallerFrame::labeled(origin, label))
}

/// Number of frames currently on this thread's stack.
pub fn depth() -> usize {
    FRAMES.with(|stack| stack.borrow().len())
}

fn push(frame: CallerFrame) -> FrameGuard {
    let depth = FRAMES.with(|stack| {
        let mut stack = stack.borrow_mut();
        let depth = stack.len();
        stack.push(frame);
        depth
    });
    FrameGuard {
        depth,
        _thread_bound: PhantomData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_is_innermost_first() {
        let _outer = enter_frame("/srv/app/main.rs");
        let _inner = enter_labeled_frame("/srv/app/trusted/x.rs", "load_secret");

        let chain = CallChain::capture();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.frames()[0].origin, PathBuf::from("/srv/app/trusted/x.rs"));
        assert_eq!(chain.frames()[0].label.as_deref(), Some("load_secret"));
        assert_eq!(chain.frames()[1].origin, PathBuf::from("/srv/app/main.rs"));
    }

    #[test]
    fn guard_pops_frame_on_drop() {
        let before = depth();
        {
            let _guard = enter_frame("/srv/app/a.rs");
            assert_eq!(depth(), before + 1);
        }
        assert_eq!(depth(), before);
        assert!(CallChain::capture().is_empty());
    }

    #[test]
    fn out_of_order_drop_truncates() {
        let before = depth();
        let outer = enter_frame("/a.rs");
        let inner = enter_frame("/b.rs");
        drop(outer);
        assert_eq!(depth(), before);
        drop(inner);
        assert_eq!(depth(), before);
    }

    #[test]
    fn frames_are_per_thread() {
        let _guard = enter_frame("/srv/app/main.rs");
        let other = std::thread::spawn(|| CallChain::capture().len())
            .join()
            .unwrap();
        assert_eq!(other, 0);
        assert_eq!(CallChain::capture().len(), 1);
    }

    #[test]
    fn explicit_chain_builders() {
        let chain = CallChain::from_origins(["/outer.rs"])
            .with_innermost(CallerFrame::new("/inner.rs"));
        let origins: Vec<&Path> = chain.origins().collect();
        assert_eq!(origins, vec![Path::new("/inner.rs"), Path::new("/outer.rs")]);
        assert!(CallChain::empty().is_empty());
    }
}
