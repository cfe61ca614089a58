//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Height that keeps the source aspect ratio at `target_width`.
///
/// Never returns 0, so a very wide source still yields a 1px-tall variant.
///
/// # Examples
/// ```
/// # use imitari::imaging::scaled_height;
/// assert_eq!(scaled_height((1600, 900), 800), 450);
/// assert_eq!(scaled_height((1000, 1), 10), 1);
/// ```
pub fn scaled_height(source: (u32, u32), target_width: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return src_h.max(1);
    }
    let h = (target_width as f64 * src_h as f64 / src_w as f64).round() as u32;
    h.max(1)
}
