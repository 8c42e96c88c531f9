use anyhow::{Context, Result, bail};
use regex::Regex;
use std::process::Command;
use tracing::{debug, warn};

use crate::core::snapshot::{ServiceEntry, StartupItem, StartupKind, WirelessAdapter};
use crate::core::surface::ControlSurface;

const RUN_KEY: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Run";

/// Command-driven implementation of the control surface: `powercfg`,
/// `reg`, `schtasks` and PowerShell one-liners.
pub struct WindowsSurface;

impl WindowsSurface {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsSurface {
    fn default() -> Self {
        Self::new()
    }
}

fn run(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute {program}"))?;

    if !output.status.success() {
        bail!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn powershell(script: &str) -> Result<String> {
    run(
        "powershell",
        &["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", script],
    )
}

/// PowerShell single-quoted literal; embedded quotes are doubled.
fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl ControlSurface for WindowsSurface {
    fn active_power_plan(&self) -> Result<String> {
        let output = run("powercfg", &["/getactivescheme"])?;
        let re = Regex::new(r"GUID:\s*([0-9a-fA-F-]{36})")?;
        let caps = re
            .captures(&output)
            .context("Could not find a scheme GUID in powercfg output")?;
        Ok(caps[1].to_string())
    }

    fn set_active_power_plan(&self, id: &str) -> Result<()> {
        run("powercfg", &["/setactive", id])?;
        debug!(target: "ecomode::platform", "Active power plan set to {id}");
        Ok(())
    }

    fn brightness(&self) -> Result<u8> {
        let output = powershell(
            "(Get-CimInstance -Namespace root/wmi -ClassName WmiMonitorBrightness).CurrentBrightness",
        )?;
        let first = output
            .lines()
            .next()
            .context("No brightness value reported")?;
        first
            .trim()
            .parse::<u8>()
            .context("Unparseable brightness value")
    }

    fn set_brightness(&self, percent: u8) -> Result<()> {
        powershell(&format!(
            "(Get-CimInstance -Namespace root/wmi -ClassName WmiMonitorBrightnessMethods).WmiSetBrightness(1, {percent})"
        ))?;
        Ok(())
    }

    fn execution_policy(&self) -> Result<String> {
        powershell("Get-ExecutionPolicy")
    }

    fn wireless_adapter(&self) -> Result<Option<WirelessAdapter>> {
        let output = powershell(
            "Get-NetAdapter -Physical | Where-Object { $_.InterfaceDescription -match 'Wireless|Wi-Fi|802\\.11' } | Select-Object -First 1 | ForEach-Object { \"$($_.Name)|$($_.Status)\" }",
        )?;

        if output.is_empty() {
            return Ok(None);
        }

        let (name, status) = output
            .split_once('|')
            .context("Unexpected adapter listing format")?;
        Ok(Some(WirelessAdapter {
            id: name.trim().to_string(),
            enabled: status.trim().eq_ignore_ascii_case("Up"),
        }))
    }

    fn set_wireless_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let verb = if enabled { "Enable-NetAdapter" } else { "Disable-NetAdapter" };
        powershell(&format!("{verb} -Name {} -Confirm:$false", ps_quote(id)))?;
        debug!(
            target: "ecomode::platform",
            "Wireless adapter {id} {}",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    fn service_state(&self, name: &str) -> Result<ServiceEntry> {
        let quoted = ps_quote(name);
        let output = powershell(&format!(
            "$svc = Get-Service -Name {quoted} -ErrorAction Stop; $wmi = Get-CimInstance Win32_Service -Filter \"Name={}\"; \"$($wmi.StartMode)|$($svc.Status)\"",
            ps_quote(name)
        ))?;

        let (start_mode, status) = output
            .split_once('|')
            .context("Unexpected service state format")?;

        let startup = match start_mode.trim() {
            "Auto" | "Automatic" => StartupKind::Automatic,
            "Manual" => StartupKind::Manual,
            "Disabled" => StartupKind::Disabled,
            other => bail!("Unknown startup type {other:?} for service {name}"),
        };

        Ok(ServiceEntry {
            name: name.to_string(),
            startup,
            running: status.trim().eq_ignore_ascii_case("Running"),
        })
    }

    fn set_service_state(&self, name: &str, startup: StartupKind, running: bool) -> Result<()> {
        let quoted = ps_quote(name);
        let script = if running {
            format!(
                "Set-Service -Name {quoted} -StartupType {}; Start-Service -Name {quoted}",
                startup.as_str()
            )
        } else {
            format!(
                "Stop-Service -Name {quoted} -Force -ErrorAction SilentlyContinue; Set-Service -Name {quoted} -StartupType {}",
                startup.as_str()
            )
        };
        powershell(&script)?;
        debug!(
            target: "ecomode::platform",
            "Service {name} set to {} (running: {running})",
            startup.as_str()
        );
        Ok(())
    }

    fn startup_items(&self) -> Result<Vec<StartupItem>> {
        let mut items = Vec::new();

        match registry_run_items() {
            Ok(mut found) => items.append(&mut found),
            Err(e) => warn!(
                target: "ecomode::platform",
                "Could not enumerate run-key entries: {e:#}"
            ),
        }

        match startup_folder_shortcuts() {
            Ok(mut found) => items.append(&mut found),
            Err(e) => warn!(
                target: "ecomode::platform",
                "Could not enumerate startup-folder shortcuts: {e:#}"
            ),
        }

        Ok(items)
    }

    fn restore_startup_item(&self, item: &StartupItem) -> Result<()> {
        match item {
            StartupItem::Registry { path, name, value } => {
                run("reg", &["add", path, "/v", name, "/d", value, "/f"])?;
            }
            StartupItem::Shortcut {
                path,
                target,
                arguments,
                working_dir,
            } => {
                powershell(&format!(
                    "$sh = New-Object -ComObject WScript.Shell; $s = $sh.CreateShortcut({}); $s.TargetPath = {}; $s.Arguments = {}; $s.WorkingDirectory = {}; $s.Save()",
                    ps_quote(path),
                    ps_quote(target),
                    ps_quote(arguments),
                    ps_quote(working_dir)
                ))?;
            }
        }
        Ok(())
    }

    fn enable_bluetooth_device(&self) -> Result<()> {
        powershell(
            "Get-PnpDevice -Class Bluetooth | Where-Object { $_.Status -ne 'OK' } | Enable-PnpDevice -Confirm:$false",
        )?;
        Ok(())
    }

    fn set_battery_threshold(&self, percent: u8) -> Result<()> {
        run(
            "powercfg",
            &[
                "/setdcvalueindex",
                "SCHEME_CURRENT",
                "SUB_ENERGYSAVER",
                "ESBATTTHRESHOLD",
                &percent.to_string(),
            ],
        )?;
        run("powercfg", &["/setactive", "SCHEME_CURRENT"])?;
        Ok(())
    }

    fn set_display_timeout(&self, minutes: u32) -> Result<()> {
        let value = minutes.to_string();
        run("powercfg", &["/change", "monitor-timeout-dc", &value])?;
        run("powercfg", &["/change", "monitor-timeout-ac", &value])?;
        Ok(())
    }

    fn set_background_apps_disabled(&self, disabled: bool) -> Result<()> {
        set_reg_dword(
            r"HKCU\Software\Microsoft\Windows\CurrentVersion\BackgroundAccessApplications",
            "GlobalUserDisabled",
            if disabled { 1 } else { 0 },
        )
    }

    fn set_search_indexing_disabled(&self, disabled: bool) -> Result<()> {
        if disabled {
            self.set_service_state("WSearch", StartupKind::Disabled, false)
        } else {
            self.set_service_state("WSearch", StartupKind::Automatic, true)
        }
    }

    fn set_prefetch_disabled(&self, disabled: bool) -> Result<()> {
        set_reg_dword(
            r"HKLM\SYSTEM\CurrentControlSet\Control\Session Manager\Memory Management\PrefetchParameters",
            "EnablePrefetcher",
            if disabled { 0 } else { 3 },
        )?;
        if disabled {
            self.set_service_state("SysMain", StartupKind::Disabled, false)
        } else {
            self.set_service_state("SysMain", StartupKind::Automatic, true)
        }
    }

    fn set_diagnostics_tracking_disabled(&self, disabled: bool) -> Result<()> {
        set_reg_dword(
            r"HKLM\SOFTWARE\Policies\Microsoft\Windows\DataCollection",
            "AllowTelemetry",
            if disabled { 0 } else { 1 },
        )?;
        if disabled {
            self.set_service_state("DiagTrack", StartupKind::Disabled, false)
        } else {
            self.set_service_state("DiagTrack", StartupKind::Automatic, true)
        }
    }

    fn set_visual_effects_reduced(&self, reduced: bool) -> Result<()> {
        set_reg_dword(
            r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\VisualEffects",
            "VisualFXSetting",
            if reduced { 2 } else { 0 },
        )
    }

    fn set_notifications_disabled(&self, disabled: bool) -> Result<()> {
        set_reg_dword(
            r"HKCU\Software\Microsoft\Windows\CurrentVersion\PushNotifications",
            "ToastEnabled",
            if disabled { 0 } else { 1 },
        )
    }

    fn schedule_one_shot(&self, name: &str, delay_minutes: u32, args: &[&str]) -> Result<()> {
        let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| {
            warn!(
                target: "ecomode::platform",
                "Local offset unavailable, scheduling against UTC"
            );
            time::OffsetDateTime::now_utc()
        });
        let fire_at = now + time::Duration::minutes(i64::from(delay_minutes));

        let time_format = time::macros::format_description!("[hour]:[minute]");
        let date_format = time::macros::format_description!("[month]/[day]/[year]");
        let st = fire_at.format(&time_format)?;
        let sd = fire_at.format(&date_format)?;

        let exe = std::env::current_exe().context("Could not resolve own executable path")?;
        let task = format!("\"{}\" {}", exe.display(), args.join(" "));

        run(
            "schtasks",
            &[
                "/Create", "/F", "/TN", name, "/SC", "ONCE", "/ST", &st, "/SD", &sd, "/TR", &task,
            ],
        )?;
        debug!(target: "ecomode::platform", "Task {name} scheduled for {sd} {st}");
        Ok(())
    }

    fn cancel_scheduled(&self, name: &str) -> Result<()> {
        let output = Command::new("schtasks")
            .args(["/Delete", "/TN", name, "/F"])
            .output()
            .context("Failed to execute schtasks")?;

        if output.status.success() {
            debug!(target: "ecomode::platform", "Task {name} cancelled");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        // nothing registered under that name: already the desired state
        if stderr.to_lowercase().contains("cannot find") {
            return Ok(());
        }
        bail!("schtasks exited with {}: {}", output.status, stderr.trim())
    }
}

fn set_reg_dword(path: &str, name: &str, value: u32) -> Result<()> {
    run(
        "reg",
        &[
            "add",
            path,
            "/v",
            name,
            "/t",
            "REG_DWORD",
            "/d",
            &value.to_string(),
            "/f",
        ],
    )?;
    Ok(())
}

fn registry_run_items() -> Result<Vec<StartupItem>> {
    let output = run("reg", &["query", RUN_KEY])?;
    Ok(parse_reg_query(&output))
}

fn parse_reg_query(output: &str) -> Vec<StartupItem> {
    let re = match Regex::new(r"^\s*(.+?)\s+(REG_SZ|REG_EXPAND_SZ)\s+(.*)$") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    output
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            Some(StartupItem::Registry {
                path: RUN_KEY.to_string(),
                name: caps[1].trim().to_string(),
                value: caps[3].trim().to_string(),
            })
        })
        .collect()
}

fn startup_folder_shortcuts() -> Result<Vec<StartupItem>> {
    let output = powershell(
        "$sh = New-Object -ComObject WScript.Shell; Get-ChildItem -Path \"$env:APPDATA\\Microsoft\\Windows\\Start Menu\\Programs\\Startup\" -Filter *.lnk -ErrorAction SilentlyContinue | ForEach-Object { $s = $sh.CreateShortcut($_.FullName); \"$($_.FullName)`t$($s.TargetPath)`t$($s.Arguments)`t$($s.WorkingDirectory)\" }",
    )?;

    let mut items = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 4 {
            warn!(
                target: "ecomode::platform",
                "Skipping malformed shortcut listing line"
            );
            continue;
        }
        items.push(StartupItem::Shortcut {
            path: fields[0].to_string(),
            target: fields[1].to_string(),
            arguments: fields[2].to_string(),
            working_dir: fields[3].to_string(),
        });
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reg_query_entries() {
        let output = r#"
HKEY_CURRENT_USER\Software\Microsoft\Windows\CurrentVersion\Run
    OneDrive    REG_SZ    "C:\Users\u\AppData\Local\Microsoft\OneDrive\OneDrive.exe" /background
    Steam Client    REG_EXPAND_SZ    %ProgramFiles(x86)%\Steam\steam.exe -silent
"#;

        let items = parse_reg_query(output);
        assert_eq!(items.len(), 2);
        match &items[0] {
            StartupItem::Registry { path, name, value } => {
                assert_eq!(path, RUN_KEY);
                assert_eq!(name, "OneDrive");
                assert!(value.ends_with("/background"));
            }
            other => panic!("expected a registry item, got {other:?}"),
        }
        match &items[1] {
            StartupItem::Registry { name, .. } => assert_eq!(name, "Steam Client"),
            other => panic!("expected a registry item, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_reg_query_ignores_headers_and_blanks() {
        let items = parse_reg_query("\nHKEY_CURRENT_USER\\...\\Run\n\n");
        assert!(items.is_empty());
    }

    #[test]
    fn test_ps_quote_doubles_embedded_quotes() {
        assert_eq!(ps_quote("plain"), "'plain'");
        assert_eq!(ps_quote("it's"), "'it''s'");
    }
}
