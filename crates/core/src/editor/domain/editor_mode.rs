use crate::shared::geometry::{DisplayPoint, DisplayRect};

/// A rectangle being dragged out, in display coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Draft {
    pub start: DisplayPoint,
    pub current: DisplayPoint,
}

impl Draft {
    pub fn at(point: DisplayPoint) -> Self {
        Self {
            start: point,
            current: point,
        }
    }

    pub fn rect(&self) -> DisplayRect {
        DisplayRect::from_corners(self.start, self.current)
    }
}

/// What a pointer gesture on the canvas means.
///
/// Adding and removing are mutually exclusive; entering one leaves the other.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum EditorMode {
    #[default]
    Idle,
    Adding {
        draft: Option<Draft>,
    },
    Removing,
}

impl EditorMode {
    /// Add mode on, or back to idle if it already was. An unfinished draft
    /// is dropped either way.
    pub fn toggle_add(self) -> Self {
        match self {
            Self::Adding { .. } => Self::Idle,
            _ => Self::Adding { draft: None },
        }
    }

    pub fn toggle_remove(self) -> Self {
        match self {
            Self::Removing => Self::Idle,
            _ => Self::Removing,
        }
    }

    pub fn is_adding(&self) -> bool {
        matches!(self, Self::Adding { .. })
    }

    pub fn is_removing(&self) -> bool {
        matches!(self, Self::Removing)
    }

    pub fn draft(&self) -> Option<Draft> {
        match self {
            Self::Adding { draft } => *draft,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn drafting() -> EditorMode {
        EditorMode::Adding {
            draft: Some(Draft::at(DisplayPoint::new(5.0, 5.0))),
        }
    }

    #[rstest]
    #[case::idle(EditorMode::Idle, EditorMode::Adding { draft: None })]
    #[case::from_remove(EditorMode::Removing, EditorMode::Adding { draft: None })]
    #[case::off(EditorMode::Adding { draft: None }, EditorMode::Idle)]
    #[case::drops_draft(drafting(), EditorMode::Idle)]
    fn test_toggle_add(#[case] from: EditorMode, #[case] expected: EditorMode) {
        assert_eq!(from.toggle_add(), expected);
    }

    #[rstest]
    #[case::idle(EditorMode::Idle, EditorMode::Removing)]
    #[case::from_add(drafting(), EditorMode::Removing)]
    #[case::off(EditorMode::Removing, EditorMode::Idle)]
    fn test_toggle_remove(#[case] from: EditorMode, #[case] expected: EditorMode) {
        assert_eq!(from.toggle_remove(), expected);
    }

    #[test]
    fn test_modes_are_exclusive() {
        let mode = EditorMode::Idle.toggle_add().toggle_remove();
        assert!(mode.is_removing());
        assert!(!mode.is_adding());
        assert!(mode.draft().is_none());
    }

    #[test]
    fn test_draft_rect_is_normalized() {
        let draft = Draft {
            start: DisplayPoint::new(50.0, 50.0),
            current: DisplayPoint::new(40.0, 40.0),
        };
        assert_eq!(draft.rect(), DisplayRect::new(40.0, 40.0, 10.0, 10.0));
    }
}
