//! Statement keywords
//!
//! Keywords live in three tables that are tried in order. Within a table
//! no keyword is a prefix of another, so a binary search over byte
//! prefixes finds at most one candidate; longer keywords that share a
//! prefix with a shorter one sit in an earlier table.

use super::text::is_delimiter;
use crate::expr::ArgType;
use serde::Serialize;
use std::cmp::Ordering;

/// Kind of a cached statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stmt {
    Unknown,
    Label,
    Comment,
    Implicit,
    Set,
    Local,
    If,
    ElseIf,
    Else,
    End,
    Act,
    Loop,
    For,
    Exit,
    Jump,
    GoSub,
    GoTo,
    XGoTo,
    Dynamic,
    P,
    Pl,
    Nl,
    MP,
    MPl,
    MNl,
    Clear,
    MClear,
    Cls,
    CmdClear,
    Cla,
    DelAct,
    AddObj,
    DelObj,
    KillObj,
    Unselect,
    KillVar,
    KillAll,
    CopyArr,
    SetTimer,
    Wait,
    ShowActs,
    ShowObjs,
    ShowStat,
    ShowInput,
    RefInt,
    View,
    Msg,
    Menu,
    Play,
    Close,
    CloseAll,
    OpenGame,
    SaveGame,
    OpenQst,
    IncLib,
    FreeLib,
    Exec,
}

const LEVEL_0: &[(&str, Stmt)] = &[("PLAY", Stmt::Play)];

const LEVEL_1: &[(&str, Stmt)] = &[
    ("*PL", Stmt::MPl),
    ("CLOSE ALL", Stmt::CloseAll),
    ("ELSEIF", Stmt::ElseIf),
    ("PL", Stmt::Pl),
    ("SETTIMER", Stmt::SetTimer),
    ("UNSELECT", Stmt::Unselect),
];

const LEVEL_2: &[(&str, Stmt)] = &[
    ("*CLEAR", Stmt::MClear),
    ("*CLR", Stmt::MClear),
    ("*NL", Stmt::MNl),
    ("*P", Stmt::MP),
    ("ACT", Stmt::Act),
    ("ADD OBJ", Stmt::AddObj),
    ("ADDOBJ", Stmt::AddObj),
    ("CLA", Stmt::Cla),
    ("CLEAR", Stmt::Clear),
    ("CLOSE", Stmt::Close),
    ("CLR", Stmt::Clear),
    ("CLS", Stmt::Cls),
    ("CMDCLEAR", Stmt::CmdClear),
    ("CMDCLR", Stmt::CmdClear),
    ("COPYARR", Stmt::CopyArr),
    ("DEL ACT", Stmt::DelAct),
    ("DEL OBJ", Stmt::DelObj),
    ("DELACT", Stmt::DelAct),
    ("DELOBJ", Stmt::DelObj),
    ("DYNAMIC", Stmt::Dynamic),
    ("ELSE", Stmt::Else),
    ("END", Stmt::End),
    ("EXEC", Stmt::Exec),
    ("EXIT", Stmt::Exit),
    ("FOR", Stmt::For),
    ("FREELIB", Stmt::FreeLib),
    ("GOSUB", Stmt::GoSub),
    ("GOTO", Stmt::GoTo),
    ("GS", Stmt::GoSub),
    ("GT", Stmt::GoTo),
    ("IF", Stmt::If),
    ("INCLIB", Stmt::IncLib),
    ("JUMP", Stmt::Jump),
    ("KILLALL", Stmt::KillAll),
    ("KILLOBJ", Stmt::KillObj),
    ("KILLVAR", Stmt::KillVar),
    ("LET", Stmt::Set),
    ("LOCAL", Stmt::Local),
    ("LOOP", Stmt::Loop),
    ("MENU", Stmt::Menu),
    ("MSG", Stmt::Msg),
    ("NL", Stmt::Nl),
    ("OPENGAME", Stmt::OpenGame),
    ("OPENQST", Stmt::OpenQst),
    ("P", Stmt::P),
    ("REFINT", Stmt::RefInt),
    ("SAVEGAME", Stmt::SaveGame),
    ("SET", Stmt::Set),
    ("SHOWACTS", Stmt::ShowActs),
    ("SHOWINPUT", Stmt::ShowInput),
    ("SHOWOBJS", Stmt::ShowObjs),
    ("SHOWSTAT", Stmt::ShowStat),
    ("UNSEL", Stmt::Unselect),
    ("VIEW", Stmt::View),
    ("WAIT", Stmt::Wait),
    ("XGOTO", Stmt::XGoTo),
    ("XGT", Stmt::XGoTo),
];

const LEVELS: [&[(&str, Stmt)]; 3] = [LEVEL_0, LEVEL_1, LEVEL_2];

fn compare_prefix(keyword: &str, text: &str) -> Ordering {
    let head = &text.as_bytes()[..text.len().min(keyword.len())];
    keyword.as_bytes().cmp(head)
}

/// Statement starting at the beginning of an upper-cased `text`
///
/// Returns the kind and, for keywords, the keyword length.
pub fn statement_at(text: &str) -> (Stmt, Option<usize>) {
    match text.as_bytes().first() {
        None => return (Stmt::Unknown, None),
        Some(b':') => return (Stmt::Label, None),
        Some(b'!') => return (Stmt::Comment, None),
        Some(_) => {}
    }
    for level in LEVELS {
        if let Ok(i) = level.binary_search_by(|(keyword, _)| compare_prefix(keyword, text)) {
            let (keyword, kind) = level[i];
            let len = keyword.len();
            if text.len() == len || is_delimiter(text.as_bytes()[len]) {
                return (kind, Some(len));
            }
        }
    }
    (Stmt::Unknown, None)
}

use ArgType::{Any, Number as N, String as S};

impl Stmt {
    /// Minimum and maximum argument count
    pub fn arity(self) -> (usize, usize) {
        match self {
            Stmt::Implicit | Stmt::If | Stmt::ElseIf => (1, 1),
            Stmt::Act => (1, 2),
            Stmt::AddObj => (1, 3),
            Stmt::CopyArr => (2, 4),
            Stmt::DelAct
            | Stmt::DelObj
            | Stmt::Exec
            | Stmt::IncLib
            | Stmt::Jump
            | Stmt::Msg
            | Stmt::OpenQst
            | Stmt::P
            | Stmt::MP => (1, 1),
            Stmt::Dynamic | Stmt::GoSub | Stmt::GoTo | Stmt::XGoTo => (1, 20),
            Stmt::KillObj => (0, 1),
            Stmt::KillVar => (0, 2),
            Stmt::Menu => (1, 3),
            Stmt::Pl | Stmt::Nl | Stmt::MPl | Stmt::MNl => (0, 1),
            Stmt::OpenGame | Stmt::SaveGame | Stmt::View | Stmt::Close => (0, 1),
            Stmt::Play => (1, 2),
            Stmt::SetTimer
            | Stmt::Wait
            | Stmt::ShowActs
            | Stmt::ShowObjs
            | Stmt::ShowStat
            | Stmt::ShowInput => (1, 1),
            _ => (0, 0),
        }
    }

    /// Type the `index`-th argument is evaluated to
    pub fn arg_type(self, index: usize) -> ArgType {
        let types: &[ArgType] = match self {
            Stmt::Implicit => &[Any],
            Stmt::If | Stmt::ElseIf | Stmt::KillObj => &[N],
            Stmt::Act => &[S, S],
            Stmt::AddObj => &[S, S, N],
            Stmt::CopyArr => &[S, S, N, N],
            Stmt::Dynamic | Stmt::GoSub | Stmt::GoTo | Stmt::XGoTo | Stmt::KillVar => &[S, Any],
            Stmt::Menu => &[S, N, N],
            Stmt::Play => &[S, N],
            Stmt::SetTimer
            | Stmt::Wait
            | Stmt::ShowActs
            | Stmt::ShowObjs
            | Stmt::ShowStat
            | Stmt::ShowInput => &[N],
            _ => &[S],
        };
        match types.get(index).or(types.last()) {
            Some(ty) => *ty,
            None => Any,
        }
    }

    /// Statements whose header ends at the first top-level colon
    pub fn ends_at_colon(self) -> bool {
        matches!(self, Stmt::If | Stmt::ElseIf | Stmt::Act | Stmt::Loop | Stmt::For)
    }

    /// Statements that open a block closed by `END` when multiline
    pub fn opens_block(self) -> bool {
        matches!(self, Stmt::If | Stmt::Act | Stmt::Loop | Stmt::For)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_sorted() {
        for level in LEVELS {
            assert!(level.windows(2).all(|w| w[0].0.as_bytes() < w[1].0.as_bytes()));
        }
    }

    #[test]
    fn test_keyword_needs_delimiter() {
        assert_eq!(statement_at("P 'x'"), (Stmt::P, Some(1)));
        assert_eq!(statement_at("PL"), (Stmt::Pl, Some(2)));
        assert_eq!(statement_at("PLAY 'a.mp3'"), (Stmt::Play, Some(4)));
        assert_eq!(statement_at("PLAYER = 1"), (Stmt::Unknown, None));
        assert_eq!(statement_at("FORM = 1"), (Stmt::Unknown, None));
        assert_eq!(statement_at("IF(X):"), (Stmt::If, Some(2)));
    }

    #[test]
    fn test_longer_keywords_win() {
        assert_eq!(statement_at("*PL 'x'").0, Stmt::MPl);
        assert_eq!(statement_at("*P 'x'").0, Stmt::MP);
        assert_eq!(statement_at("ELSEIF X:").0, Stmt::ElseIf);
        assert_eq!(statement_at("ELSE").0, Stmt::Else);
        assert_eq!(statement_at("CLOSE ALL").0, Stmt::CloseAll);
        assert_eq!(statement_at("CLOSE 'a'").0, Stmt::Close);
        assert_eq!(statement_at("UNSELECT").0, Stmt::Unselect);
        assert_eq!(statement_at("ADD OBJ 'x'").0, Stmt::AddObj);
    }

    #[test]
    fn test_label_and_comment() {
        assert_eq!(statement_at(":start").0, Stmt::Label);
        assert_eq!(statement_at("! note").0, Stmt::Comment);
        assert_eq!(statement_at("").0, Stmt::Unknown);
    }

    #[test]
    fn test_arity_and_types() {
        assert_eq!(Stmt::GoSub.arity(), (1, 20));
        assert_eq!(Stmt::GoSub.arg_type(0), ArgType::String);
        assert_eq!(Stmt::GoSub.arg_type(7), ArgType::Any);
        assert_eq!(Stmt::AddObj.arg_type(2), ArgType::Number);
        assert_eq!(Stmt::Cls.arity(), (0, 0));
    }
}
