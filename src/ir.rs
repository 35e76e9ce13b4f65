//! Absolute-positioned visual tree produced by layouts and consumed by the SVG writer.

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f32,
    pub height: f32,
    pub background: String,
    pub children: Vec<Element>,
}

impl Scene {
    pub fn new(width: f32, height: f32, background: impl Into<String>) -> Self {
        Self {
            width,
            height,
            background: background.into(),
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, element: impl Into<Element>) {
        self.children.push(element.into());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Rect(Rect),
    Circle(Circle),
    Text(Text),
    Image(Image),
    Group(Group),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
    pub fill: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// One or more lines of text. `y` is the baseline of the first line.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub x: f32,
    pub y: f32,
    pub lines: Vec<String>,
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: u16,
    pub line_height: f32,
    pub fill: String,
    pub anchor: TextAnchor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub href: String,
    pub rounded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub opacity: f32,
    pub children: Vec<Element>,
}

impl From<Rect> for Element {
    fn from(value: Rect) -> Self {
        Element::Rect(value)
    }
}

impl From<Circle> for Element {
    fn from(value: Circle) -> Self {
        Element::Circle(value)
    }
}

impl From<Text> for Element {
    fn from(value: Text) -> Self {
        Element::Text(value)
    }
}

impl From<Image> for Element {
    fn from(value: Image) -> Self {
        Element::Image(value)
    }
}

impl From<Group> for Element {
    fn from(value: Group) -> Self {
        Element::Group(value)
    }
}
