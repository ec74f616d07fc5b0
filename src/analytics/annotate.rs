use opencv::core::{Mat, Point, Rect, Scalar};
use opencv::imgproc;

use super::detector::Detection;

/// Draw detection boxes and labels onto the frame before it is
/// published. The watched class is drawn in red, everything else green.
pub fn draw_detections(
    frame: &mut Mat,
    detections: &[Detection],
    watched_class: &str,
) -> opencv::Result<()> {
    for det in detections {
        let color = if det.class_name == watched_class {
            Scalar::new(0.0, 0.0, 255.0, 0.0)
        } else {
            Scalar::new(0.0, 255.0, 0.0, 0.0)
        };

        let rect = Rect::new(
            det.x as i32,
            det.y as i32,
            det.width as i32,
            det.height as i32,
        );
        imgproc::rectangle(frame, rect, color, 2, imgproc::LINE_8, 0)?;

        let label = format!("{} {:.0}%", det.class_name, det.confidence * 100.0);
        let anchor = Point::new(rect.x, (rect.y - 6).max(12));
        imgproc::put_text(
            frame,
            &label,
            anchor,
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.5,
            color,
            1,
            imgproc::LINE_AA,
            false,
        )?;
    }

    Ok(())
}
