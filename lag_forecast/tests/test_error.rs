use lag_forecast::error::ForecastError;
use lag_math::MathError;
use std::io;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    assert!(matches!(ForecastError::from(io_error), ForecastError::IoError(_)));

    let math_error = MathError::SingularMatrix("pivot 0".to_string());
    assert!(matches!(
        ForecastError::from(math_error),
        ForecastError::Math(MathError::SingularMatrix(_))
    ));

    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(
        ForecastError::from(json_error),
        ForecastError::ConfigError(_)
    ));
}

#[test]
fn test_error_display() {
    let error = ForecastError::insufficient("walk-forward training prefix", 5, 3);
    let text = error.to_string();
    assert!(text.contains("walk-forward training prefix"));
    assert!(text.contains("need 5"));
    assert!(text.contains("have 3"));

    let error = ForecastError::NonFiniteSeriesValue {
        series: "imports".to_string(),
        index: 7,
    };
    assert_eq!(error.to_string(), "Non-finite value in series 'imports' at row 7");

    let error = ForecastError::UnrecognizedMonth("Smarch".to_string());
    assert!(error.to_string().contains("\"Smarch\""));

    let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
    let text = ForecastError::from(io_error).to_string();
    assert!(text.contains("IO error"));
    assert!(text.contains("permission denied"));
}

#[test]
fn test_anyhow_compatibility() {
    fn fails() -> anyhow::Result<()> {
        Err(ForecastError::LagOrderSelectionFailure("singular covariance".to_string()).into())
    }
    let err = fails().unwrap_err();
    assert!(err.to_string().contains("singular covariance"));
    assert!(err.downcast_ref::<ForecastError>().is_some());
}
