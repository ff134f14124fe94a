/// Horizontal alignment shared by the authoring deck and the layout model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

pub(crate) struct Document {
    pub title: Option<String>,
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub line_spacing: f32, // auto line spacing factor (e.g. 259/240)
    pub paragraphs: Vec<Paragraph>,
}

pub(crate) struct EmbeddedImage {
    pub data: Vec<u8>,
    pub display_width: f32,  // points
    pub display_height: f32, // points
}

pub(crate) struct Paragraph {
    pub runs: Vec<Run>,
    pub style_id: Option<String>,
    pub space_before: f32,
    pub space_after: f32,
    pub alignment: Alignment,
    pub indent_left: f32,
    pub indent_hanging: f32,
    pub list_label: String,
    pub contextual_spacing: bool,
    pub page_break_before: bool,
    pub page_breaks: usize, // explicit w:br type="page" preceding this paragraph
    pub keep_next: bool,
    pub line_spacing: Option<f32>, // per-paragraph override (e.g. 240/240 = 1.0)
    pub mark_font_size: f32,       // paragraph mark, sizes empty lines and list labels
    pub mark_font_name: String,
    pub image: Option<EmbeddedImage>,
}

pub(crate) struct Run {
    pub text: String, // '\n' marks a hard line break
    pub font_size: f32,
    pub font_name: String,
    pub bold: bool,
    pub italic: bool,
    pub color: Option<[u8; 3]>, // None = automatic (black)
}
