use std::mem;

use crate::record::{Kind, Point, Record};
use crate::render::{box_segments, segment, Primitive};

/// Drawn after the text being typed; never stored.
pub const CARET: char = '|';

// ── Input ───────────────────────────────────────────────────────────────────

/// Pointer position in image space, or `None` off the drawing surface.
pub type Hit = Option<Point>;

#[derive(Clone, Debug, PartialEq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter,
    /// A letter pressed with the control modifier, lowercased.
    Ctrl(char),
    Other,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    Press(Hit),
    Move(Hit),
    Release(Hit),
    Key(Key),
}

impl InputEvent {
    pub fn is_pointer(&self) -> bool {
        !matches!(self, InputEvent::Key(_))
    }
}

// ── Tools ───────────────────────────────────────────────────────────────────

/// The active drawing mode. Each variant turns input into at most one
/// finalized record per event.
#[derive(Debug)]
pub enum Tool {
    Shape(ShapeTool),
    Text(TextTool),
}

impl Tool {
    pub fn new(kind: Kind) -> Self {
        match kind {
            Kind::Line => Tool::Shape(ShapeTool::new(Kind::Line)),
            Kind::Rectangle => Tool::Shape(ShapeTool::new(Kind::Rectangle)),
            Kind::Text => Tool::Text(TextTool::default()),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Tool::Shape(tool) => tool.kind,
            Tool::Text(_) => Kind::Text,
        }
    }

    pub fn handle(&mut self, event: &InputEvent) -> Option<Record> {
        match self {
            Tool::Shape(tool) => tool.handle(event),
            Tool::Text(tool) => tool.handle(event),
        }
    }

    /// Called when another tool takes over. Pending text is kept, a shape
    /// still being dragged is dropped.
    pub fn deactivate(&mut self) -> Option<Record> {
        match self {
            Tool::Shape(tool) => {
                tool.cancel();
                None
            }
            Tool::Text(tool) => tool.commit(),
        }
    }

    /// Finalizes whatever gesture is in flight. Used before saving.
    pub fn flush(&mut self) -> Option<Record> {
        match self {
            Tool::Shape(tool) => tool.flush(),
            Tool::Text(tool) => tool.commit(),
        }
    }

    pub fn cancel(&mut self) {
        match self {
            Tool::Shape(tool) => tool.cancel(),
            Tool::Text(tool) => tool.state = TextState::Idle,
        }
    }

    pub fn preview(&self) -> Vec<Primitive> {
        match self {
            Tool::Shape(tool) => tool.preview(),
            Tool::Text(tool) => tool.preview(),
        }
    }

    /// True while keystrokes belong to the tool rather than to shortcuts.
    pub fn captures_keyboard(&self) -> bool {
        matches!(
            self,
            Tool::Text(TextTool {
                state: TextState::Editing { .. }
            })
        )
    }
}

// ── Line / rectangle ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum ShapeState {
    Idle,
    Dragging { origin: Point, cursor: Point },
}

#[derive(Debug)]
pub struct ShapeTool {
    kind: Kind,
    state: ShapeState,
}

impl ShapeTool {
    fn new(kind: Kind) -> Self {
        debug_assert!(kind != Kind::Text);
        Self {
            kind,
            state: ShapeState::Idle,
        }
    }

    fn handle(&mut self, event: &InputEvent) -> Option<Record> {
        match *event {
            InputEvent::Press(Some(at)) => {
                self.state = ShapeState::Dragging {
                    origin: at,
                    cursor: at,
                };
                None
            }
            InputEvent::Move(Some(at)) => {
                if let ShapeState::Dragging { cursor, .. } = &mut self.state {
                    *cursor = at;
                }
                None
            }
            InputEvent::Release(hit) => {
                let ShapeState::Dragging { origin, .. } =
                    mem::replace(&mut self.state, ShapeState::Idle)
                else {
                    return None;
                };
                match hit {
                    Some(end) => Some(Record::shape(self.kind, origin, end)),
                    None => {
                        log::debug!("{} released off the image, discarded", self.kind);
                        None
                    }
                }
            }
            InputEvent::Press(None) | InputEvent::Move(None) | InputEvent::Key(_) => None,
        }
    }

    fn flush(&mut self) -> Option<Record> {
        match mem::replace(&mut self.state, ShapeState::Idle) {
            ShapeState::Dragging { origin, cursor } => {
                Some(Record::shape(self.kind, origin, cursor))
            }
            ShapeState::Idle => None,
        }
    }

    fn cancel(&mut self) {
        self.state = ShapeState::Idle;
    }

    fn preview(&self) -> Vec<Primitive> {
        let ShapeState::Dragging { origin, cursor } = self.state else {
            return Vec::new();
        };
        match self.kind {
            Kind::Rectangle => box_segments(origin, cursor).to_vec(),
            _ => vec![segment(origin, cursor)],
        }
    }
}

// ── Text ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
enum TextState {
    #[default]
    Idle,
    Editing { origin: Point, buffer: String },
}

#[derive(Debug, Default)]
pub struct TextTool {
    state: TextState,
}

impl TextTool {
    fn handle(&mut self, event: &InputEvent) -> Option<Record> {
        match event {
            InputEvent::Press(Some(at)) => {
                let pending = self.commit();
                self.state = TextState::Editing {
                    origin: *at,
                    buffer: String::new(),
                };
                pending
            }
            InputEvent::Key(key) => self.key(key),
            InputEvent::Press(None) | InputEvent::Move(_) | InputEvent::Release(_) => None,
        }
    }

    fn key(&mut self, key: &Key) -> Option<Record> {
        let TextState::Editing { buffer, .. } = &mut self.state else {
            return None;
        };
        match key {
            Key::Char(c) if !c.is_control() => buffer.push(*c),
            Key::Backspace => {
                buffer.pop();
            }
            Key::Enter => return self.commit(),
            Key::Char(_) | Key::Ctrl(_) | Key::Other => {}
        }
        None
    }

    fn commit(&mut self) -> Option<Record> {
        match mem::take(&mut self.state) {
            TextState::Editing { origin, buffer } => Some(Record::text(origin, buffer)),
            TextState::Idle => None,
        }
    }

    fn preview(&self) -> Vec<Primitive> {
        match &self.state {
            TextState::Editing { origin, buffer } => vec![Primitive::Text {
                at: *origin,
                text: format!("{buffer}{CARET}"),
            }],
            TextState::Idle => Vec::new(),
        }
    }
}
