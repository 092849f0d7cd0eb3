//! Key reference shown by the help view.

/// Lines of the help view, top to bottom.
pub const HELP_LINES: &[&str] = &[
    "pathed key bindings",
    "",
    "List",
    "  Up/Down, j/k          move cursor",
    "  Shift+Up/Down, J/K    move entry within its section",
    "  Left/Right            scroll long paths",
    "  PgUp/PgDn, Ctrl+U/D   page",
    "  Home/End, g/G         first/last entry",
    "  Tab/Enter             change entry in the directory browser",
    "  a                     add entry (user section when sectioned)",
    "  A                     add system entry (sectioned only)",
    "  c                     mark missing and duplicate entries deleted",
    "  Delete                toggle the deletion mark",
    "  ?                     show this help",
    "  q                     quit",
    "  Ctrl+C                quit without saving",
    "",
    "Directory browser",
    "  Enter                 open directory",
    "  a-z                   jump to the next name with that letter",
    "  Tab                   select the current directory",
    "  Esc                   cancel",
    "",
    "Markers",
    "  -  deleted    +  added    *  modified",
    "  ?  directory does not exist",
    "",
    "Help",
    "  Up/Down, j/k          scroll",
    "  Esc, ?, h             close",
];
