//! `--lookat` camera interchange.
//!
//! A pose is nine comma-separated floats: `eye,center,up`.

use std::str::FromStr;

use glam::Vec3;

use crate::camera::Camera;
use crate::errors::CameraError;

/// Parse `ex,ey,ez,cx,cy,cz,ux,uy,uz` into a camera.
pub fn parse_lookat(input: &str) -> Result<Camera, CameraError> {
    let invalid = |reason: String| CameraError::InvalidLookAt {
        input: input.to_string(),
        reason,
    };

    let values = input
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| invalid(format!("'{}': {}", part.trim(), e)))
        })
        .collect::<Result<Vec<f32>, _>>()?;

    if values.len() != 9 {
        return Err(invalid(format!("expected 9 values, found {}", values.len())));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(invalid("values must be finite".to_string()));
    }

    let eye = Vec3::from_slice(&values[0..3]);
    let center = Vec3::from_slice(&values[3..6]);
    let up = Vec3::from_slice(&values[6..9]);
    Camera::new(eye, center, up).map_err(|e| invalid(e.to_string()))
}

/// Format a camera as `ex,ey,ez,cx,cy,cz,ux,uy,uz`.
pub fn format_lookat(camera: &Camera) -> String {
    let (e, c, u) = (camera.eye(), camera.center(), camera.up());
    format!(
        "{},{},{},{},{},{},{},{},{}",
        e.x, e.y, e.z, c.x, c.y, c.z, u.x, u.y, u.z
    )
}

/// The command-line argument that reproduces the camera.
pub fn lookat_argument(camera: &Camera) -> String {
    format!("--lookat {}", format_lookat(camera))
}

impl FromStr for Camera {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_lookat(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let camera = parse_lookat("0,0,5, 0,0,0, 0,1,0").unwrap();
        assert_eq!(camera.eye(), Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.center(), Vec3::ZERO);
        assert_eq!(camera.up(), Vec3::Y);
    }

    #[test]
    fn test_parse_via_from_str() {
        let camera: Camera = "1,2,3,1,2,0,0,1,0".parse().unwrap();
        assert_eq!(camera.eye(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_wrong_count() {
        let err = parse_lookat("1,2,3").unwrap_err();
        assert!(matches!(err, CameraError::InvalidLookAt { .. }));
        assert!(err.to_string().contains("expected 9 values, found 3"));
    }

    #[test]
    fn test_not_a_number() {
        assert!(parse_lookat("0,0,5,0,0,0,0,one,0").is_err());
        assert!(parse_lookat("0,0,5,0,0,0,0,NaN,0").is_err());
    }

    #[test]
    fn test_degenerate_pose() {
        let err = parse_lookat("0,0,0,0,0,0,0,1,0").unwrap_err();
        assert!(err.to_string().contains("eye and center coincide"));
    }

    #[test]
    fn test_argument_format() {
        let camera = Camera::new(Vec3::new(0.0, 1.5, 4.0), Vec3::new(0.0, 1.5, 0.0), Vec3::Y).unwrap();
        insta::assert_snapshot!(lookat_argument(&camera), @"--lookat 0,1.5,4,0,1.5,0,0,1,0");
    }

    #[test]
    fn test_round_trip() {
        let camera = Camera::new(
            Vec3::new(0.25, -3.5, 7.125),
            Vec3::new(1.0, 2.0, -3.0),
            Vec3::new(0.1, 1.0, 0.2),
        )
        .unwrap();
        let parsed = parse_lookat(&format_lookat(&camera)).unwrap();
        assert_eq!(parsed.eye(), camera.eye());
        assert_eq!(parsed.center(), camera.center());
        assert!((parsed.up() - camera.up()).length() < 1e-5);
    }
}
