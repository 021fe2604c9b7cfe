//! Layout resolution: mapping a slide's position to a concrete layout of
//! the base document.
//!
//! Resolution is name-first (exact, case-sensitive match on the layout's
//! display name, across every master's layouts in master order) with a
//! positional fallback into the layout list. Resolution never fails hard;
//! degraded lookups are logged and the closest layout is used.

use deck_core::LayoutRole;

/// One layout of the base document.
#[derive(Debug, Clone)]
pub struct LayoutInfo {
    /// Display name from the layout's `<p:cSld name="...">`, possibly empty.
    pub name: String,
    /// Part path, e.g. `ppt/slideLayouts/slideLayout1.xml`.
    pub path: String,
    /// Whether the layout carries a body placeholder (`idx="1"`).
    pub has_body_placeholder: bool,
}

/// Positional fallback index for a role.
fn fallback_index(role: LayoutRole) -> usize {
    match role {
        LayoutRole::Title => 0,
        LayoutRole::Content => 1,
    }
}

/// Resolve the layout for a role against the available layouts.
///
/// Callers guarantee `layouts` is non-empty (enforced when the base
/// package is opened).
pub fn resolve(layouts: &[LayoutInfo], role: LayoutRole) -> &LayoutInfo {
    let wanted = role.layout_name();
    if let Some(found) = layouts.iter().find(|l| l.name == wanted) {
        return found;
    }

    let index = fallback_index(role);
    match layouts.get(index) {
        Some(layout) => {
            log::warn!(
                "no layout named {:?}; falling back to layout index {}",
                wanted,
                index
            );
            layout
        }
        None => {
            log::warn!(
                "no layout named {:?} and index {} is out of range; using first layout",
                wanted,
                index
            );
            &layouts[0]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(name: &str, path: &str) -> LayoutInfo {
        LayoutInfo {
            name: name.to_string(),
            path: path.to_string(),
            has_body_placeholder: true,
        }
    }

    #[test]
    fn test_resolve_by_name() {
        let layouts = vec![
            layout("Custom Opener", "l1"),
            layout("Title and Content", "l2"),
            layout("Title Slide", "l3"),
        ];
        assert_eq!(resolve(&layouts, LayoutRole::Title).path, "l3");
        assert_eq!(resolve(&layouts, LayoutRole::Content).path, "l2");
    }

    #[test]
    fn test_resolve_name_is_case_sensitive() {
        let layouts = vec![layout("title slide", "l1"), layout("Second", "l2")];
        // No exact name match: positional fallback applies.
        assert_eq!(resolve(&layouts, LayoutRole::Title).path, "l1");
        assert_eq!(resolve(&layouts, LayoutRole::Content).path, "l2");
    }

    #[test]
    fn test_resolve_positional_fallback_single_layout() {
        let layouts = vec![layout("Only", "l1")];
        assert_eq!(resolve(&layouts, LayoutRole::Title).path, "l1");
        assert_eq!(resolve(&layouts, LayoutRole::Content).path, "l1");
    }
}
