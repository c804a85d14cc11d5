//! The known accessibility roles and states, as reported by the bridge in `en_US`.
//!
//! Both enumerations are advisory: the bridge may report values that are not
//! listed here, and such values are carried around as plain strings.

use std::fmt;
use std::str::FromStr;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Accessible roles of the Java Access Bridge.
    Role {
        Alert => "alert",
        AwtComponent => "awt component",
        Canvas => "canvas",
        CheckBox => "check box",
        ColorChooser => "color chooser",
        ColumnHeader => "column header",
        ComboBox => "combo box",
        DateEditor => "date editor",
        DesktopIcon => "desktop icon",
        DesktopPane => "desktop pane",
        Dialog => "dialog",
        DirectoryPane => "directory pane",
        EditBar => "editbar",
        FileChooser => "file chooser",
        Filler => "filler",
        FontChooser => "font chooser",
        Footer => "footer",
        Frame => "frame",
        GlassPane => "glass pane",
        Header => "header",
        HtmlContainer => "html container",
        Hyperlink => "hyperlink",
        Icon => "icon",
        InternalFrame => "internal frame",
        Label => "label",
        LayeredPane => "layered pane",
        List => "list",
        ListItem => "list item",
        Menu => "menu",
        MenuBar => "menu bar",
        MenuItem => "menu item",
        OptionPane => "option pane",
        PageTab => "page tab",
        PageTabList => "page tab list",
        Panel => "panel",
        Paragraph => "paragraph",
        PasswordText => "password text",
        PopupMenu => "popup menu",
        ProgressBar => "progress bar",
        PushButton => "push button",
        RadioButton => "radio button",
        RootPane => "root pane",
        RowHeader => "row header",
        Ruler => "ruler",
        ScrollBar => "scroll bar",
        ScrollPane => "scroll pane",
        Separator => "separator",
        Slider => "slider",
        SpinBox => "spinbox",
        SplitPane => "split pane",
        StatusBar => "status bar",
        SwingComponent => "swing component",
        Table => "table",
        Text => "text",
        ToggleButton => "toggle button",
        ToolBar => "tool bar",
        ToolTip => "tool tip",
        Tree => "tree",
        Unknown => "unknown",
        Viewport => "viewport",
        Window => "window",
    }
}

string_enum! {
    /// Accessible states of the Java Access Bridge.
    State {
        Active => "active",
        Armed => "armed",
        Busy => "busy",
        Checked => "checked",
        Collapsed => "collapsed",
        Editable => "editable",
        Enabled => "enabled",
        Expandable => "expandable",
        Expanded => "expanded",
        Focusable => "focusable",
        Focused => "focused",
        Horizontal => "horizontal",
        Iconified => "iconified",
        Indeterminate => "indeterminate",
        Modal => "modal",
        MultiLine => "multi_line",
        MultiSelectable => "multiselectable",
        Opaque => "opaque",
        Pressed => "pressed",
        Resizable => "resizable",
        Selectable => "selectable",
        Selected => "selected",
        Showing => "showing",
        SingleLine => "single_line",
        Transient => "transient",
        Vertical => "vertical",
        Visible => "visible",
    }
}

impl Role {
    /// Returns whether `name` is one of the documented roles.
    pub fn is_known(name: &str) -> bool {
        name.parse::<Role>().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(*role));
        }
        assert_eq!("check box".parse::<Role>(), Ok(Role::CheckBox));
        assert!(Role::is_known("internal frame"));
        assert!(!Role::is_known("hologram"));
    }

    #[test]
    fn state_names() {
        assert_eq!(State::MultiLine.to_string(), "multi_line");
        assert_eq!("showing".parse::<State>(), Ok(State::Showing));
        assert!("SHOWING".parse::<State>().is_err());
    }
}
