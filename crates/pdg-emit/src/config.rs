use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentStyle {
    /// `// text`
    Line,
    /// `/* text */`
    Block,
}

impl CommentStyle {
    /// Wrap `text` in comment delimiters. Each line of a multi-line text is delimited on its own.
    pub fn format(&self, text: &str) -> String {
        text.split('\n')
            .map(|line| match self {
                CommentStyle::Line => format!("// {}", line),
                CommentStyle::Block => format!("/* {} */", line),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Upper bound on indentation and comment padding, in columns.
pub const MAX_INDENT_WIDTH: usize = 256;

/// Pretty-printer settings for one decompilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStyle {
    pub comment_style: CommentStyle,
    pub space_after_comma: bool,
    pub newline_before_brace: bool,
    pub newline_before_else: bool,
    pub newline_after_prototype: bool,
    pub indent_increment: usize,
    /// Spaces between a statement and its trailing comment.
    pub comment_indent: usize,
    pub max_line_len: usize,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            comment_style: CommentStyle::Block,
            space_after_comma: false,
            newline_before_brace: false,
            newline_before_else: false,
            newline_after_prototype: true,
            indent_increment: 2,
            comment_indent: 20,
            max_line_len: 100,
        }
    }
}

impl RenderStyle {
    pub fn from_options(options: &StyleOptions) -> Self {
        let mut style = Self::default();
        style.apply(options);
        style
    }

    /// Overlay stored options. Absent options keep the current value; comma spacing is always
    /// switched on and the blank line after the prototype always off.
    pub fn apply(&mut self, options: &StyleOptions) {
        if let Some(cpp) = options.cpp_comments {
            self.comment_style = if cpp {
                CommentStyle::Line
            } else {
                CommentStyle::Block
            };
        }

        self.space_after_comma = true;

        if let Some(nl) = options.newline_before_brace {
            self.newline_before_brace = nl;
        }
        if let Some(nl) = options.newline_before_else {
            self.newline_before_else = nl;
        }

        self.newline_after_prototype = false;

        if let Some(indent) = options.indent_increment {
            self.indent_increment = indent.min(MAX_INDENT_WIDTH);
        }
        if let Some(indent) = options.comment_indent {
            self.comment_indent = indent.min(MAX_INDENT_WIDTH);
        }
        if let Some(len) = options.max_line_len {
            self.max_line_len = len;
        }
    }
}

/// Style settings as read from a configuration store; `None` means "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleOptions {
    pub cpp_comments: Option<bool>,
    pub comment_indent: Option<usize>,
    pub newline_before_brace: Option<bool>,
    pub newline_before_else: Option<bool>,
    pub indent_increment: Option<usize>,
    pub max_line_len: Option<usize>,
}
