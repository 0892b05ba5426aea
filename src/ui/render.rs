// Geometry and pixel primitives. `ViewerState::render` decides what goes
// where; everything in here works on plain numbers and slices.

pub const BG_COLOR: [u8; 4] = [31, 31, 31, 255]; // ~0.12 * 255

/// Pack RGB into softbuffer u32 format: 0x00RRGGBB.
pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Unpack softbuffer u32 into (r, g, b).
fn unpack_rgb(v: u32) -> (u8, u8, u8) {
    ((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Drawable area in framebuffer pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    pub width: f32,
    pub height: f32,
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1) as f32,
            height: height.max(1) as f32,
        }
    }
}

/// Where a page lands on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StripLayout {
    /// Pages intersecting the screen band, top to bottom.
    pub visible: Vec<Placement>,
    /// Total height of all decoded pages at full width.
    pub content_height: f32,
}

pub fn fit_scale(img_w: f32, img_h: f32, win_w: f32, win_h: f32) -> f32 {
    (win_w / img_w).min(win_h / img_h)
}

/// Whole page fit inside the screen, anchored at the top-left corner.
pub fn paged_placement(index: usize, (w, h): (u32, u32), screen: ScreenSize) -> Placement {
    let (w, h) = (w as f32, h as f32);
    let scale = fit_scale(w, h, screen.width, screen.height);
    Placement {
        index,
        x: 0.0,
        y: 0.0,
        scale,
        width: w * scale,
        height: h * scale,
    }
}

/// Stack pages at full screen width starting at `scroll_y`.
///
/// Missing pages take no space. Pages outside the screen band are left out of
/// `visible` but still push the following pages down.
pub fn continuous_layout(
    sizes: &[Option<(u32, u32)>],
    screen: ScreenSize,
    scroll_y: f32,
) -> StripLayout {
    let mut layout = StripLayout::default();
    let mut cursor = 0.0f32;

    for (index, size) in sizes.iter().enumerate() {
        let Some((w, h)) = *size else { continue };
        let scale = screen.width / w as f32;
        let height = h as f32 * scale;
        let y = scroll_y + cursor;
        cursor += height;

        if y < -height || y > screen.height {
            continue;
        }
        layout.visible.push(Placement {
            index,
            x: 0.0,
            y,
            scale,
            width: screen.width,
            height,
        });
    }

    layout.content_height = cursor;
    layout
}

/// Same total as `continuous_layout(..).content_height`, without placing anything.
pub fn strip_height(sizes: &[Option<(u32, u32)>], screen: ScreenSize) -> f32 {
    sizes
        .iter()
        .flatten()
        .map(|&(w, h)| h as f32 * (screen.width / w as f32))
        .sum()
}

/// Lowest allowed scroll offset for a strip of `content_height`.
pub fn min_scroll(content_height: f32, screen: ScreenSize) -> f32 {
    -(content_height - screen.height).max(0.0)
}

// ---------------------------------------------------------------------------
// Pixels
// ---------------------------------------------------------------------------

/// Pixel count of a `fb_w` x `fb_h` framebuffer.
pub fn frame_len(fb_w: u32, fb_h: u32) -> usize {
    fb_w as usize * fb_h as usize
}

pub fn fill(dst: &mut [u32], color: [u8; 4]) {
    dst.fill(rgb(color[0], color[1], color[2]));
}

/// Draw an RGBA8 image scaled by `scale` with its top-left corner at (x0, y0),
/// bilinear filtered and alpha blended over `dst`.
pub fn blit_scaled(
    dst: &mut [u32], dst_w: u32, dst_h: u32,
    src: &[u8], src_w: u32, src_h: u32,
    x0: f32, y0: f32, scale: f32,
) {
    if src_w == 0 || src_h == 0 || scale <= 0.0 {
        return;
    }
    let draw_w = src_w as f32 * scale;
    let draw_h = src_h as f32 * scale;

    let dx_start = x0.max(0.0) as u32;
    let dy_start = y0.max(0.0) as u32;
    let dx_end = ((x0 + draw_w).ceil().max(0.0) as u32).min(dst_w);
    let dy_end = ((y0 + draw_h).ceil().max(0.0) as u32).min(dst_h);

    let inv_scale = 1.0 / scale;
    let max_x = (src_w - 1) as f32;
    let max_y = (src_h - 1) as f32;

    let px = |x: u32, y: u32| -> [f32; 4] {
        let i = (y as usize * src_w as usize + x as usize) * 4;
        [src[i] as f32, src[i + 1] as f32, src[i + 2] as f32, src[i + 3] as f32]
    };

    for dy in dy_start..dy_end {
        let vy = ((dy as f32 + 0.5 - y0) * inv_scale - 0.5).clamp(0.0, max_y);
        let sy0 = vy as u32;
        let sy1 = (sy0 + 1).min(src_h - 1);
        let fy = vy - sy0 as f32;

        for dx in dx_start..dx_end {
            let vx = ((dx as f32 + 0.5 - x0) * inv_scale - 0.5).clamp(0.0, max_x);
            let sx0 = vx as u32;
            let sx1 = (sx0 + 1).min(src_w - 1);
            let fx = vx - sx0 as f32;

            let (a, b, c, d) = (px(sx0, sy0), px(sx1, sy0), px(sx0, sy1), px(sx1, sy1));
            let mut s = [0.0f32; 4];
            for k in 0..4 {
                let top = a[k] + (b[k] - a[k]) * fx;
                let bottom = c[k] + (d[k] - c[k]) * fx;
                s[k] = top + (bottom - top) * fy;
            }

            let di = dy as usize * dst_w as usize + dx as usize;
            let sa = s[3].round() as u32;
            if sa >= 255 {
                dst[di] = rgb(s[0].round() as u8, s[1].round() as u8, s[2].round() as u8);
            } else if sa > 0 {
                let inv = 255 - sa;
                let (dr, dg, db) = unpack_rgb(dst[di]);
                let r = ((s[0] as u32 * sa + dr as u32 * inv) / 255) as u8;
                let g = ((s[1] as u32 * sa + dg as u32 * inv) / 255) as u8;
                let b = ((s[2] as u32 * sa + db as u32 * inv) / 255) as u8;
                dst[di] = rgb(r, g, b);
            }
        }
    }
}
