use std::{borrow::Cow, io::Cursor, sync::Arc};

use crate::error::{SceneTraceError, SceneTraceResult};

/// Default file name for an exported meme.
pub const MEME_FILE_NAME: &str = "trace-meme.png";

/// Classic meme lettering; resolved from the system font collection unless
/// explicit font bytes are supplied.
pub const CAPTION_FONT_STACK: &str = "Impact, Arial Black, sans-serif";

const CAPTION_SIZE_FRAC: f32 = 0.05;
const CAPTION_MIN_SIZE_PX: f32 = 24.0;
const CAPTION_MAX_SIZE_PX: f32 = 40.0;
const CAPTION_INSET_FRAC: f32 = 0.05;
const CAPTION_EDGE_FRAC: f32 = 0.04;

// Two offset rings approximating the stacked text-shadow outline of classic
// meme captions; multiplied by the render scale.
const OUTLINE_OFFSETS: [(f32, f32); 8] = [
    (-2.0, -2.0),
    (2.0, -2.0),
    (-2.0, 2.0),
    (2.0, 2.0),
    (-3.0, -3.0),
    (3.0, -3.0),
    (-3.0, 3.0),
    (3.0, 3.0),
];

#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Resolution multiplier applied to the base image, countering output
    /// blur on high-density displays.
    pub scale: f32,
    /// Raw font-file bytes for the captions; `None` uses the system stack.
    pub font_bytes: Option<Vec<u8>>,
    /// Opaque fallback painted under the base image, since the source may
    /// have transparency.
    pub background: [u8; 4],
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            font_bytes: None,
            background: [0, 0, 0, 255],
        }
    }
}

/// A captioned scene image and, after an explicit render, its PNG artifact.
///
/// The artifact is kept until the captions change or a new render replaces
/// it; a failed render leaves captions and base image untouched so the caller
/// may retry.
#[derive(Debug)]
pub struct MemeComposition {
    base: image::RgbaImage,
    top_caption: String,
    bottom_caption: String,
    rendered: Option<Vec<u8>>,
}

impl MemeComposition {
    /// Decode base image bytes into a composition with empty captions.
    pub fn from_image_bytes(bytes: &[u8]) -> SceneTraceResult<Self> {
        let base = image::load_from_memory(bytes)
            .map_err(|e| {
                SceneTraceError::compose(format!(
                    "could not decode the base image (it may be protected or not an image): {e}"
                ))
            })?
            .to_rgba8();
        Ok(Self {
            base,
            top_caption: String::new(),
            bottom_caption: String::new(),
            rendered: None,
        })
    }

    pub fn base_dimensions(&self) -> (u32, u32) {
        self.base.dimensions()
    }

    pub fn top_caption(&self) -> &str {
        &self.top_caption
    }

    pub fn bottom_caption(&self) -> &str {
        &self.bottom_caption
    }

    /// Replace both captions. Any previously rendered artifact no longer
    /// matches the inputs and is cleared.
    pub fn set_captions(&mut self, top: impl Into<String>, bottom: impl Into<String>) {
        self.top_caption = top.into();
        self.bottom_caption = bottom.into();
        self.rendered = None;
    }

    /// The last rendered PNG, if any.
    pub fn rendered_png(&self) -> Option<&[u8]> {
        self.rendered.as_deref()
    }

    /// Rasterize the composition and store the PNG artifact.
    #[tracing::instrument(skip(self, options), fields(scale = options.scale))]
    pub fn render(&mut self, options: &RenderOptions) -> SceneTraceResult<&[u8]> {
        let png = compose_png(
            &self.base,
            &self.top_caption,
            &self.bottom_caption,
            options,
        )?;
        Ok(self.rendered.insert(png).as_slice())
    }
}

enum CaptionSlot {
    Top,
    Bottom,
}

/// Caption size in base-image pixels, before the render scale is applied.
fn caption_size_px(base_width: u32) -> f32 {
    (base_width as f32 * CAPTION_SIZE_FRAC).clamp(CAPTION_MIN_SIZE_PX, CAPTION_MAX_SIZE_PX)
}

fn compose_png(
    base: &image::RgbaImage,
    top_caption: &str,
    bottom_caption: &str,
    options: &RenderOptions,
) -> SceneTraceResult<Vec<u8>> {
    if !options.scale.is_finite() || options.scale <= 0.0 {
        return Err(SceneTraceError::validation(
            "render scale must be finite and > 0",
        ));
    }

    let (base_w, base_h) = base.dimensions();
    if base_w == 0 || base_h == 0 {
        return Err(SceneTraceError::compose("base image has zero dimensions"));
    }
    let out_w = ((base_w as f32) * options.scale).round().max(1.0) as u32;
    let out_h = ((base_h as f32) * options.scale).round().max(1.0) as u32;
    let w16: u16 = out_w
        .try_into()
        .map_err(|_| SceneTraceError::compose("meme output width exceeds the raster surface"))?;
    let h16: u16 = out_h
        .try_into()
        .map_err(|_| SceneTraceError::compose("meme output height exceeds the raster surface"))?;

    let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
    let mut ctx = vello_cpu::RenderContext::new(w16, h16);

    let [r, g, b, a] = options.background;
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(out_w),
        f64::from(out_h),
    ));

    let base_paint = image_paint(base)?;
    ctx.set_transform(vello_cpu::kurbo::Affine::scale(f64::from(options.scale)));
    ctx.set_paint(base_paint);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(base_w),
        f64::from(base_h),
    ));

    let mut engine = CaptionLayoutEngine::new();
    let size_px = caption_size_px(base_w) * options.scale;
    let max_width = (out_w as f32) * (1.0 - 2.0 * CAPTION_INSET_FRAC);
    let inset_x = (out_w as f32) * CAPTION_INSET_FRAC;

    for (text, slot) in [
        (top_caption, CaptionSlot::Top),
        (bottom_caption, CaptionSlot::Bottom),
    ] {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let upper = text.to_uppercase();
        let layout = engine.layout(&upper, size_px, max_width, options.font_bytes.as_deref())?;
        let y = match slot {
            CaptionSlot::Top => (out_h as f32) * CAPTION_EDGE_FRAC,
            CaptionSlot::Bottom => (out_h as f32) * (1.0 - CAPTION_EDGE_FRAC) - layout.height(),
        };
        draw_caption(&mut ctx, &layout, inset_x, y, options.scale);
    }

    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);

    encode_png(pixmap.data_as_u8_slice(), out_w, out_h)
}

/// Convert a straight-alpha RGBA image into a premultiplied pixmap paint.
fn image_paint(base: &image::RgbaImage) -> SceneTraceResult<vello_cpu::Image> {
    let (w, h) = base.dimensions();
    let w16: u16 = w
        .try_into()
        .map_err(|_| SceneTraceError::compose("base image width exceeds u16"))?;
    let h16: u16 = h
        .try_into()
        .map_err(|_| SceneTraceError::compose("base image height exceeds u16"))?;

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(w as usize * h as usize);
    for px in base.as_raw().chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        let [r, g, b, a] = premul_rgba8(px[0], px[1], px[2], a);
        pixels.push(vello_cpu::peniko::color::PremulRgba8 { r, g, b, a });
    }

    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(
            vello_cpu::Pixmap::from_parts_with_opacity(pixels, w16, h16, may_have_opacities),
        )),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn premul_rgba8(r: u8, g: u8, b: u8, a: u8) -> [u8; 4] {
    let af = (a as u16) + 1;
    let premul = |c: u8| -> u8 { (((c as u16) * af) >> 8) as u8 };
    [premul(r), premul(g), premul(b), a]
}

/// Marker brush for caption layouts; paint colors are chosen per pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct CaptionBrush;

/// Stateful helper for building Parley caption layouts.
struct CaptionLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<CaptionBrush>,
}

impl CaptionLayoutEngine {
    fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Shape and lay out one caption, centered and line-broken to the given
    /// width. Explicit font bytes override the system stack.
    fn layout(
        &mut self,
        text: &str,
        size_px: f32,
        max_width_px: f32,
        font_bytes: Option<&[u8]>,
    ) -> SceneTraceResult<parley::Layout<CaptionBrush>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(SceneTraceError::validation(
                "caption size_px must be finite and > 0",
            ));
        }

        let stack = match font_bytes {
            Some(bytes) => {
                let families = self
                    .font_ctx
                    .collection
                    .register_fonts(parley::fontique::Blob::from(bytes.to_vec()), None);
                let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
                    SceneTraceError::validation("no font families registered from font bytes")
                })?;
                let family_name = self
                    .font_ctx
                    .collection
                    .family_name(family_id)
                    .ok_or_else(|| {
                        SceneTraceError::validation("registered font family has no name")
                    })?
                    .to_string();
                parley::style::FontStack::Source(Cow::Owned(family_name))
            }
            None => parley::style::FontStack::Source(Cow::Borrowed(CAPTION_FONT_STACK)),
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(stack));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(CaptionBrush));

        let mut layout: parley::Layout<CaptionBrush> = builder.build(text);
        layout.break_all_lines(Some(max_width_px));
        layout.align(
            Some(max_width_px),
            parley::Alignment::Center,
            parley::AlignmentOptions::default(),
        );
        Ok(layout)
    }
}

fn draw_caption(
    ctx: &mut vello_cpu::RenderContext,
    layout: &parley::Layout<CaptionBrush>,
    x: f32,
    y: f32,
    scale: f32,
) {
    let outline = vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255);
    let fill = vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255);

    for (dx, dy) in OUTLINE_OFFSETS {
        draw_layout(ctx, layout, x + dx * scale, y + dy * scale, outline);
    }
    draw_layout(ctx, layout, x, y, fill);
}

fn draw_layout(
    ctx: &mut vello_cpu::RenderContext,
    layout: &parley::Layout<CaptionBrush>,
    x: f32,
    y: f32,
    color: vello_cpu::peniko::Color,
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((
        f64::from(x),
        f64::from(y),
    )));
    ctx.set_paint(color);

    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };

            let font = run.run().font();
            let font_data = vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(font.data.as_ref().to_vec()),
                font.index,
            );
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(&font_data)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

fn encode_png(rgba: &[u8], width: u32, height: u32) -> SceneTraceResult<Vec<u8>> {
    use image::ImageEncoder as _;

    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(Cursor::new(&mut out))
        .write_image(rgba, width, height, image::ExtendedColorType::Rgba8)
        .map_err(|e| SceneTraceError::compose(format!("png encode failed: {e}")))?;
    Ok(out)
}
