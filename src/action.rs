use crate::composer::ComposerTab;
use crate::error::NatterError;
use crate::thread::InitialLoad;
use crate::types::{IssueComment, ReactionKind};

/// Which pane receives key input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Timeline,
    Composer,
}

#[derive(Debug)]
pub enum Action {
    Quit,

    // Loading
    LoadThread,
    ThreadLoaded(Box<InitialLoad>),
    LoadMore,
    HiddenPageLoaded {
        page: u32,
        result: Result<Vec<IssueComment>, String>,
    },

    // Timeline navigation
    SelectNext,
    SelectPrev,
    GoToTop,
    GoToBottom,
    Activate,
    OpenInBrowser,
    SignIn,

    // Composer
    SetFocus(Focus),
    Input(char),
    Paste(String),
    Backspace,
    CursorLeft,
    CursorRight,
    SelectTab(ComposerTab),
    PreviewRendered {
        generation: u64,
        html: String,
    },
    Submit,
    CommentPosted(Result<Box<IssueComment>, String>),

    // Reactions
    OpenReactionMenu,
    PopupUp,
    PopupDown,
    PopupSelect,
    PopupClose,
    ReactionAdded {
        comment_id: u64,
        kind: ReactionKind,
    },
    CommentRefreshed(Box<IssueComment>),

    Error(String),
    None,
}

impl From<NatterError> for Action {
    fn from(err: NatterError) -> Self {
        Action::Error(err.to_string())
    }
}
