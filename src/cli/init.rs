use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path, shellexpand_path};

pub fn run(master: Option<&str>, export_dir: Option<&str>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(path) = master {
        settings.master_path = shellexpand_path(path);
    }
    if let Some(dir) = export_dir {
        settings.export_dir = shellexpand_path(dir);
    }

    let export_dir = settings.export_dir();
    std::fs::create_dir_all(&export_dir)?;
    save_settings(&settings)?;

    println!("Settings:    {}", settings_path().display());
    println!("AF master:   {}", settings.master_path);
    println!("Export dir:  {}", export_dir.display());
    if !settings.master_path().is_file() {
        println!();
        println!("AF master not found yet. CV reports need it; pass --master or re-run init.");
    }
    Ok(())
}
