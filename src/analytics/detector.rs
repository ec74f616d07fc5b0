use ndarray::Array4;
use opencv::core::{Mat, Scalar, Size, BORDER_CONSTANT};
use opencv::imgproc;
use opencv::prelude::*;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;
use thiserror::Error;

const MODEL_INPUT_SIZE: i32 = 640;
const IOU_THRESHOLD: f32 = 0.45;

#[rustfmt::skip]
const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear",
    "hair drier", "toothbrush",
];

/// True if `name` is a label the model can actually emit.
pub fn is_known_class(name: &str) -> bool {
    COCO_CLASSES.contains(&name)
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("inference session error: {0}")]
    Session(#[from] ort::Error),
    #[error("image preprocessing error: {0}")]
    Image(#[from] opencv::Error),
    #[error("unsupported model output layout")]
    OutputLayout,
    #[error("frame data too small for model input")]
    InputTooSmall,
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub class_name: String,
    pub class_id: usize,
    pub confidence: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// YOLO-family single-image detector over an ONNX session.
pub struct ObjectDetector {
    session: Session,
    confidence_threshold: f32,
}

impl ObjectDetector {
    pub fn new(model_path: &str, confidence_threshold: f32) -> Result<Self, DetectError> {
        let builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        let session = if model_path.starts_with("http://") || model_path.starts_with("https://") {
            builder.commit_from_url(model_path)?
        } else {
            builder.commit_from_file(model_path)?
        };

        Ok(Self {
            session,
            confidence_threshold,
        })
    }

    pub fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>, DetectError> {
        let rows = frame.rows();
        let cols = frame.cols();
        if rows == 0 || cols == 0 {
            return Ok(Vec::new());
        }

        let (tensor, geometry) = self.preprocess(frame)?;

        let tensor_ref = TensorRef::from_array_view(tensor.view())?.into_dyn();
        let outputs = self.session.run(ort::inputs![tensor_ref])?;

        // YOLOv8 layout: one "output0" tensor of shape [1, 4 + classes, anchors]
        let Some(output) = outputs.get("output0") else {
            return Err(DetectError::OutputLayout);
        };
        let predictions = output.try_extract_array::<f32>()?;
        let predictions = predictions.to_owned();
        drop(outputs);

        let shape = predictions.shape();
        if shape.len() != 3 || shape[1] <= 4 {
            return Err(DetectError::OutputLayout);
        }
        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];
        let flat = predictions
            .as_slice()
            .ok_or(DetectError::OutputLayout)?;

        let mut candidates = Vec::new();
        for anchor in 0..num_anchors {
            let mut best_score = 0.0f32;
            let mut best_class = 0usize;
            for class in 0..num_classes {
                let score = flat[(4 + class) * num_anchors + anchor];
                if score > best_score {
                    best_score = score;
                    best_class = class;
                }
            }

            if best_score < self.confidence_threshold {
                continue;
            }

            let cx = flat[anchor];
            let cy = flat[num_anchors + anchor];
            let w = flat[2 * num_anchors + anchor];
            let h = flat[3 * num_anchors + anchor];

            let class_name = match COCO_CLASSES.get(best_class) {
                Some(name) => (*name).to_string(),
                None => format!("class_{best_class}"),
            };

            candidates.push(geometry.unmap(Detection {
                class_name,
                class_id: best_class,
                confidence: best_score,
                x: cx - w / 2.0,
                y: cy - h / 2.0,
                width: w,
                height: h,
            }));
        }

        Ok(non_max_suppression(candidates, IOU_THRESHOLD))
    }

    /// Letterbox to the model input square and repack HWC BGR bytes into
    /// a normalized NCHW RGB tensor.
    fn preprocess(&self, frame: &Mat) -> Result<(Array4<f32>, Letterbox), DetectError> {
        let geometry = Letterbox::fit(frame.cols(), frame.rows(), MODEL_INPUT_SIZE);

        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            Size::new(geometry.scaled_width, geometry.scaled_height),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let mut padded = Mat::default();
        opencv::core::copy_make_border(
            &resized,
            &mut padded,
            geometry.pad_y,
            MODEL_INPUT_SIZE - geometry.scaled_height - geometry.pad_y,
            geometry.pad_x,
            MODEL_INPUT_SIZE - geometry.scaled_width - geometry.pad_x,
            BORDER_CONSTANT,
            Scalar::new(114.0, 114.0, 114.0, 0.0),
        )?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(&padded, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let side = MODEL_INPUT_SIZE as usize;
        let data = rgb.data_bytes()?;
        if data.len() < side * side * 3 {
            return Err(DetectError::InputTooSmall);
        }

        let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
        for y in 0..side {
            for x in 0..side {
                let idx = (y * side + x) * 3;
                for channel in 0..3 {
                    tensor[[0, channel, y, x]] = data[idx + channel] as f32 / 255.0;
                }
            }
        }

        Ok((tensor, geometry))
    }
}

/// Mapping between source-image and letterboxed model coordinates.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    scaled_width: i32,
    scaled_height: i32,
    pad_x: i32,
    pad_y: i32,
    source_width: f32,
    source_height: f32,
}

impl Letterbox {
    fn fit(cols: i32, rows: i32, target: i32) -> Self {
        let scale = (target as f32 / cols as f32).min(target as f32 / rows as f32);
        let scaled_width = (cols as f32 * scale).round() as i32;
        let scaled_height = (rows as f32 * scale).round() as i32;
        Self {
            scale,
            scaled_width,
            scaled_height,
            pad_x: (target - scaled_width) / 2,
            pad_y: (target - scaled_height) / 2,
            source_width: cols as f32,
            source_height: rows as f32,
        }
    }

    /// Translate a box from letterbox pixels back to source pixels,
    /// clamped to the image bounds.
    fn unmap(&self, det: Detection) -> Detection {
        let x = ((det.x - self.pad_x as f32) / self.scale).clamp(0.0, self.source_width);
        let y = ((det.y - self.pad_y as f32) / self.scale).clamp(0.0, self.source_height);
        let width = (det.width / self.scale).min(self.source_width - x);
        let height = (det.height / self.scale).min(self.source_height - y);
        Detection {
            x,
            y,
            width,
            height,
            ..det
        }
    }
}

fn iou(a: &Detection, b: &Detection) -> f32 {
    let left = a.x.max(b.x);
    let top = a.y.max(b.y);
    let right = (a.x + a.width).min(b.x + b.width);
    let bottom = (a.y + a.height).min(b.y + b.height);

    let intersection = (right - left).max(0.0) * (bottom - top).max(0.0);
    let union = a.width * a.height + b.width * b.height - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Greedy per-class suppression, highest confidence first.
fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && iou(k, &candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: usize, confidence: f32, x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection {
            class_name: format!("class_{class_id}"),
            class_id,
            confidence,
            x,
            y,
            width: w,
            height: h,
        }
    }

    #[test]
    fn test_letterbox_landscape() {
        let geometry = Letterbox::fit(1280, 720, 640);
        assert_eq!(geometry.scaled_width, 640);
        assert_eq!(geometry.scaled_height, 360);
        assert_eq!(geometry.pad_x, 0);
        assert_eq!(geometry.pad_y, 140);
        assert!((geometry.scale - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_letterbox_square_has_no_padding() {
        let geometry = Letterbox::fit(640, 640, 640);
        assert_eq!(geometry.pad_x, 0);
        assert_eq!(geometry.pad_y, 0);
        assert!((geometry.scale - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unmap_inverts_letterbox() {
        let geometry = Letterbox::fit(1280, 720, 640);
        // a box at letterbox (320, 320) size 64x32 sits at source (640, 360)
        let mapped = geometry.unmap(det(0, 0.9, 320.0, 320.0, 64.0, 32.0));
        assert!((mapped.x - 640.0).abs() < 1.0);
        assert!((mapped.y - 360.0).abs() < 1.0);
        assert!((mapped.width - 128.0).abs() < 1.0);
        assert!((mapped.height - 64.0).abs() < 1.0);
    }

    #[test]
    fn test_iou_disjoint_and_identical() {
        let a = det(0, 0.9, 0.0, 0.0, 10.0, 10.0);
        let b = det(0, 0.8, 20.0, 20.0, 10.0, 10.0);
        assert_eq!(iou(&a, &b), 0.0);
        assert!((iou(&a, &a) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_nms_keeps_best_of_overlapping_pair() {
        let kept = non_max_suppression(
            vec![
                det(0, 0.6, 0.0, 0.0, 10.0, 10.0),
                det(0, 0.9, 1.0, 1.0, 10.0, 10.0),
            ],
            0.45,
        );
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_nms_never_suppresses_across_classes() {
        let kept = non_max_suppression(
            vec![
                det(0, 0.9, 0.0, 0.0, 10.0, 10.0),
                det(1, 0.8, 0.0, 0.0, 10.0, 10.0),
            ],
            0.45,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_known_class_lookup() {
        assert!(is_known_class("person"));
        assert!(!is_known_class("gorgonzola"));
    }
}
