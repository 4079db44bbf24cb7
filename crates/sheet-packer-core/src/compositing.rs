use image::{Rgba, RgbaImage};

/// Copy `src` into `canvas` with its top-left corner at (dx, dy), then optionally
/// draw a red 1px outline on the copied area for debugging.
///
/// Straight copy: destination pixels are replaced, not blended. Pixels falling
/// outside the canvas are dropped.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32, outlines: bool) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = src.dimensions();

    for yy in 0..sh {
        let ty = dy + yy;
        if ty >= ch {
            break;
        }
        for xx in 0..sw {
            let tx = dx + xx;
            if tx >= cw {
                break;
            }
            canvas.put_pixel(tx, ty, *src.get_pixel(xx, yy));
        }
    }

    if outlines && sw > 0 && sh > 0 {
        let red = Rgba([255, 0, 0, 255]);
        let bx = dx + sw - 1;
        let by = dy + sh - 1;
        for xx in dx..=bx {
            if xx < cw && dy < ch {
                canvas.put_pixel(xx, dy, red);
            }
            if xx < cw && by < ch {
                canvas.put_pixel(xx, by, red);
            }
        }
        for yy in dy..=by {
            if dx < cw && yy < ch {
                canvas.put_pixel(dx, yy, red);
            }
            if bx < cw && yy < ch {
                canvas.put_pixel(bx, yy, red);
            }
        }
    }
}
