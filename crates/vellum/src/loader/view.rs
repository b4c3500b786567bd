//! What the viewer shows for each status.

use crate::error::LoadError;
use crate::loader::password::PasswordVerifier;
use crate::loader::status::LoadingStatus;
use std::fmt;

/// Caller-supplied renderers. Only `render` is mandatory; missing optional
/// renderers fall back to the built-in error panel and spinner.
pub struct Renderers<'a, D, T> {
    render: Box<dyn Fn(&D) -> T + 'a>,
    render_error: Option<Box<dyn Fn(&LoadError) -> T + 'a>>,
    render_loader: Option<Box<dyn Fn(f64) -> T + 'a>>,
}

impl<'a, D, T> Renderers<'a, D, T> {
    pub fn new(render: impl Fn(&D) -> T + 'a) -> Self {
        Self {
            render: Box::new(render),
            render_error: None,
            render_loader: None,
        }
    }

    pub fn with_error(mut self, render_error: impl Fn(&LoadError) -> T + 'a) -> Self {
        self.render_error = Some(Box::new(render_error));
        self
    }

    pub fn with_loader(mut self, render_loader: impl Fn(f64) -> T + 'a) -> Self {
        self.render_loader = Some(Box::new(render_loader));
        self
    }

    /// Dispatch on `status`. Pure: calls at most one renderer and nothing else.
    pub fn view(&self, status: &LoadingStatus<D>) -> LoaderView<T> {
        match status {
            LoadingStatus::AskingForPassword { verify } => LoaderView::PasswordPrompt {
                verify: verify.clone(),
                wrong_password: false,
            },
            LoadingStatus::WrongPassword { verify } => LoaderView::PasswordPrompt {
                verify: verify.clone(),
                wrong_password: true,
            },
            LoadingStatus::Completed { document } => LoaderView::Document((self.render)(document)),
            LoadingStatus::Failed { error } => match &self.render_error {
                Some(render_error) => LoaderView::Error(render_error(error)),
                None => LoaderView::ErrorPanel {
                    message: error.message.clone(),
                },
            },
            LoadingStatus::Loading { percentages } => {
                LoaderView::Loading(self.render_loader.as_ref().map(|render_loader| render_loader(*percentages)))
            }
        }
    }
}

/// The single region the loader occupies in the viewer.
pub enum LoaderView<T> {
    /// Password entry wired to `verify`; `wrong_password` adds the error indicator.
    PasswordPrompt { verify: PasswordVerifier, wrong_password: bool },
    /// Output of the caller's document renderer.
    Document(T),
    /// Output of the caller's error renderer.
    Error(T),
    /// Built-in error panel.
    ErrorPanel { message: String },
    /// Loading region: caller's progress output, or `None` for the built-in spinner.
    Loading(Option<T>),
}

impl<T> LoaderView<T> {
    /// Class of the wrapping element for built-in regions, e.g. `rpv-doc-loading`.
    pub fn css_class(&self, prefix: &str) -> Option<String> {
        match self {
            LoaderView::ErrorPanel { .. } => Some(format!("{}-doc-error", prefix)),
            LoaderView::Loading(_) => Some(format!("{}-doc-loading", prefix)),
            _ => None,
        }
    }

    /// Class of the message element inside the built-in error panel.
    pub fn text_css_class(&self, prefix: &str) -> Option<String> {
        match self {
            LoaderView::ErrorPanel { .. } => Some(format!("{}-doc-error-text", prefix)),
            _ => None,
        }
    }

    pub fn is_spinner(&self) -> bool {
        matches!(self, LoaderView::Loading(None))
    }
}

impl<T: fmt::Debug> fmt::Debug for LoaderView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderView::PasswordPrompt { verify, wrong_password } => f
                .debug_struct("PasswordPrompt")
                .field("round", &verify.round())
                .field("wrong_password", wrong_password)
                .finish(),
            LoaderView::Document(output) => f.debug_tuple("Document").field(output).finish(),
            LoaderView::Error(output) => f.debug_tuple("Error").field(output).finish(),
            LoaderView::ErrorPanel { message } => f.debug_struct("ErrorPanel").field("message", message).finish(),
            LoaderView::Loading(output) => f.debug_tuple("Loading").field(output).finish(),
        }
    }
}
