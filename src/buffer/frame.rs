use opencv::core::Mat;
use opencv::prelude::*;

/// One BGR8 image, either straight from the camera or with detections
/// drawn on top. Never mutated after publication; the pipeline publishes
/// a replacement instead.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: i32,
    pub height: i32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Copy a continuous BGR matrix into an owned frame.
    pub fn from_mat(mat: &Mat) -> opencv::Result<Self> {
        Ok(Self {
            width: mat.cols(),
            height: mat.rows(),
            data: mat.data_bytes()?.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC3};

    #[test]
    fn test_from_mat_copies_pixels() {
        let mat =
            Mat::new_rows_cols_with_default(4, 6, CV_8UC3, Scalar::new(7.0, 7.0, 7.0, 0.0))
                .unwrap();

        let frame = Frame::from_mat(&mat).unwrap();

        assert_eq!(frame.width, 6);
        assert_eq!(frame.height, 4);
        assert_eq!(frame.data.len(), 4 * 6 * 3);
        assert!(frame.data.iter().all(|&b| b == 7));
    }
}
