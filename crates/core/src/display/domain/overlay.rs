use crate::shared::frame::Frame;
use crate::shared::region::Region;

pub const OVERLAY_COLOR: [u8; 3] = [0, 255, 0];
pub const OVERLAY_THICKNESS: u32 = 2;

/// Draws a green outline around every region, clipped to the frame.
pub fn draw_regions(frame: &mut Frame, regions: &[Region]) {
    for region in regions {
        draw_rect(frame, region, OVERLAY_COLOR, OVERLAY_THICKNESS);
    }
}

/// Draws a rectangle border of the given thickness, growing inwards.
pub fn draw_rect(frame: &mut Frame, region: &Region, color: [u8; 3], thickness: u32) {
    let (w, h) = (frame.width(), frame.height());
    let Some(visible) = region.clamp_to(w, h) else {
        return;
    };
    let x0 = visible.x as u32;
    let y0 = visible.y as u32;
    let x1 = x0 + visible.width as u32 - 1;
    let y1 = y0 + visible.height as u32 - 1;

    for t in 0..thickness {
        let xx0 = x0.saturating_add(t);
        let yy0 = y0.saturating_add(t);
        let xx1 = x1.saturating_sub(t);
        let yy1 = y1.saturating_sub(t);
        if xx0 > xx1 || yy0 > yy1 {
            break;
        }
        for x in xx0..=xx1 {
            put_pixel(frame, x, yy0, color);
            put_pixel(frame, x, yy1, color);
        }
        for y in yy0..=yy1 {
            put_pixel(frame, xx0, y, color);
            put_pixel(frame, xx1, y, color);
        }
    }
}

fn put_pixel(frame: &mut Frame, x: u32, y: u32, color: [u8; 3]) {
    let channels = frame.channels() as usize;
    let offset = (y as usize * frame.width() as usize + x as usize) * channels;
    let take = channels.min(3);
    frame.data_mut()[offset..offset + take].copy_from_slice(&color[..take]);
}
