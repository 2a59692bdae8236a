use lag_forecast::cleaning::MissingPolicy;
use lag_forecast::{DataLoader, DatePolicy, ForecastError, LoadOptions};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

// Rows deliberately out of order, with grouped thousands and a bad cell
fn create_sample_table() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Month,Year,GCC_Total_Imports,Estimated_Violence_Fatalities,Brent_Crude_Price_USD_Barrel").unwrap();
    writeln!(file, "March,2021,\"1,300\",12,64.5").unwrap();
    writeln!(file, "jan,2021,\"1,100\",10,55.1").unwrap();
    writeln!(file, "Feb.,2021,\"1,200\",N/A,62.3").unwrap();
    writeln!(file, "Sept,2020, 900 ,7,41.0").unwrap();
    file
}

#[test]
fn test_loader_sorts_and_normalizes_months() {
    let file = create_sample_table();
    let data = DataLoader::from_csv(file.path(), &LoadOptions::default()).unwrap();

    assert_eq!(data.len(), 4);
    assert_eq!(
        data.dates(),
        vec![month(2020, 9), month(2021, 1), month(2021, 2), month(2021, 3)]
    );
    assert_eq!(
        data.columns(),
        &[
            "GCC_Total_Imports".to_string(),
            "Estimated_Violence_Fatalities".to_string(),
            "Brent_Crude_Price_USD_Barrel".to_string(),
        ]
    );
    assert_eq!(data.column_at(1).unwrap(), "Estimated_Violence_Fatalities");
}

#[test]
fn test_series_follow_missing_policy() {
    let file = create_sample_table();
    let data = DataLoader::from_csv(file.path(), &LoadOptions::default()).unwrap();

    let imports = data
        .series("GCC_Total_Imports", MissingPolicy::DropOnInvalid)
        .unwrap();
    assert_eq!(
        imports.values(),
        &[Some(900.0), Some(1100.0), Some(1200.0), Some(1300.0)]
    );

    let dropped = data
        .series("Estimated_Violence_Fatalities", MissingPolicy::DropOnInvalid)
        .unwrap();
    assert_eq!(dropped.values(), &[Some(7.0), Some(10.0), None, Some(12.0)]);

    let zeroed = data
        .series("Estimated_Violence_Fatalities", MissingPolicy::ZeroOnInvalid)
        .unwrap();
    assert_eq!(zeroed.values(), &[Some(7.0), Some(10.0), Some(0.0), Some(12.0)]);
}

#[test]
fn test_unreadable_dates_follow_policy() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Month,Year,oil").unwrap();
    writeln!(file, "January,2021,50").unwrap();
    writeln!(file, "Smarch,2021,51").unwrap();
    writeln!(file, "March,twenty,52").unwrap();
    writeln!(file, "April,2021.0,53").unwrap();

    let data = DataLoader::from_csv(file.path(), &LoadOptions::default()).unwrap();
    assert_eq!(data.dates(), vec![month(2021, 1), month(2021, 4)]);

    let halt = LoadOptions {
        date_policy: DatePolicy::Halt,
        ..LoadOptions::default()
    };
    assert!(matches!(
        DataLoader::from_csv(file.path(), &halt),
        Err(ForecastError::UnrecognizedMonth(_))
    ));
}

#[test]
fn test_loader_error_handling() {
    // Non-existent file
    let result = DataLoader::from_csv("nonexistent_file.csv", &LoadOptions::default());
    assert!(matches!(result, Err(ForecastError::IoError(_))));

    // Missing Month header
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "month,Year,oil").unwrap();
    writeln!(file, "January,2021,50").unwrap();
    let result = DataLoader::from_csv(file.path(), &LoadOptions::default());
    assert!(matches!(result, Err(ForecastError::MissingColumn(_))));

    // Same month twice
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Month,Year,oil").unwrap();
    writeln!(file, "January,2021,50").unwrap();
    writeln!(file, "Jan,2021,51").unwrap();
    let result = DataLoader::from_csv(file.path(), &LoadOptions::default());
    assert!(matches!(result, Err(ForecastError::DataError(_))));

    // Custom header names
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "mon,yr,oil").unwrap();
    writeln!(file, "Dec,2019,50").unwrap();
    let options = LoadOptions {
        month_column: "mon".to_string(),
        year_column: "yr".to_string(),
        ..LoadOptions::default()
    };
    let data = DataLoader::from_csv(file.path(), &options).unwrap();
    assert_eq!(data.dates(), vec![month(2019, 12)]);
}
