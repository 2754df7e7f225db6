use std::error::Error;

use dt9837_bridge::{
    AcquisitionConfig, AcquisitionParams, DeviceSession, DtLibrary, driver::default_library_name,
    measure,
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let library = std::env::var_os("DT_LIB_PATH").unwrap_or_else(default_library_name);
    let session = DeviceSession::new(DtLibrary::load(&library)?);
    session.connect()?;

    let config = AcquisitionConfig::measurement(AcquisitionParams {
        duration_seconds: 2,
        ..AcquisitionParams::default()
    })?;
    let result = measure(&session, config);
    session.disconnect()?;
    let dataset = result?;

    eprintln!(
        "captured {} of {} readings",
        dataset.num_readings(),
        dataset.max_readings()
    );
    if let Some(last) = dataset.readings().last() {
        eprintln!("last reading: {}", last);
    }

    Ok(())
}
