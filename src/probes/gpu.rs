// GPU identity fallback chain: lspci first, then the sysfs DRM tree

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use tracing::instrument;

use super::CommandRunner;
use crate::models::NO_GPU;

/// Legacy and virtual adapters never reported as the primary GPU.
static EXCLUDE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // bare "1111 (rev 02)" device codes
        r"^1111",
        // mid-90s Cirrus Logic chips, now common as VM framebuffers
        r"(?i)^cirrus logic (cl[-\s]?)?gd 5",
        r"(?i)virtio",
        r"(?i)vmware",
        // SPICE virtual display
        r"(?i)qxl",
        r"(?i)hyper-v",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Dedicated/integrated vendors returned ahead of whatever lspci lists first.
const PRIORITY_VENDORS: &[&str] = &[
    "nvidia",
    "amd",
    "radeon",
    "intel",
    "arc",
    "snap",
    "qualcomm",
    "snapdragon",
];

/// DRM drivers backing virtual or firmware framebuffers, not real adapters.
const EXCLUDED_DRIVERS: &[&str] = &[
    "virtio-pci",
    "virtio_gpu",
    "bochs-drm",
    "qxl",
    "vmwgfx",
    "cirrus",
    "vboxvideo",
    "hyperv_fb",
    "simpledrm",
    "simplefb",
    "cirrus-qemu",
];

static ADRENO_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"adreno[-_](\d+)").expect("static pattern"));
static MALI_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"mali[-_]([a-z]\d+)").expect("static pattern"));
static SUNXI_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sun\d+i-([a-z0-9]+)").expect("static pattern"));

pub struct GpuProbe<R> {
    runner: R,
    drm_root: PathBuf,
    dt_model_path: PathBuf,
}

impl<R: CommandRunner> GpuProbe<R> {
    pub fn new(runner: R) -> Self {
        Self::with_sysfs_paths(
            runner,
            "/sys/class/drm",
            "/sys/firmware/devicetree/base/model",
        )
    }

    pub fn with_sysfs_paths(
        runner: R,
        drm_root: impl Into<PathBuf>,
        dt_model_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            drm_root: drm_root.into(),
            dt_model_path: dt_model_path.into(),
        }
    }

    /// Name of the primary display adapter, or [`NO_GPU`] when every source
    /// comes up empty.
    #[instrument(skip(self), fields(probe = "gpu", operation = "name"))]
    pub fn name(&self) -> String {
        if let Some(name) = self.from_lspci() {
            return name;
        }
        if let Some(name) = self.from_sysfs_drm() {
            return name;
        }
        NO_GPU.to_string()
    }

    fn from_lspci(&self) -> Option<String> {
        let out = self.runner.run("lspci", &[]).ok()?;

        // Only display-class lines; a vendor string alone would also match
        // that vendor's network or bluetooth devices.
        let display_lines: Vec<&str> = out.lines().filter(|l| is_display_class(l)).collect();

        for line in &display_lines {
            let lower = line.to_lowercase();
            if PRIORITY_VENDORS.iter().any(|v| lower.contains(v)) {
                if let Some(name) = extract_pci_name(line) {
                    if !is_excluded(&name) {
                        return Some(name);
                    }
                }
            }
        }

        // No priority vendor: first display device outside the blacklist.
        display_lines
            .iter()
            .find_map(|line| extract_pci_name(line).filter(|name| !is_excluded(name)))
    }

    fn from_sysfs_drm(&self) -> Option<String> {
        let mut cards: Vec<PathBuf> = std::fs::read_dir(&self.drm_root)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.file_name().to_string_lossy().starts_with("card"))
                    .map(|e| e.path())
                    .collect()
            })
            .unwrap_or_default();
        cards.sort();

        for path in cards {
            let Ok(driver_link) = std::fs::read_link(path.join("device/driver")) else {
                continue;
            };
            let Some(driver) = driver_link
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
            else {
                continue;
            };

            if EXCLUDED_DRIVERS.contains(&driver.as_str()) {
                continue;
            }

            // Device-tree compatible strings name the exact SoC, e.g.
            // "qcom,adreno-750.1\0qcom,adreno".
            if let Ok(raw) = std::fs::read(path.join("device/of_node/compatible")) {
                if let Some(model) = decode_soc_model(&driver, &raw) {
                    return Some(model);
                }
            }

            if let Some(label) = driver_label(&driver) {
                return Some(label.to_string());
            }

            if !driver.is_empty() {
                return Some(format!("Direct Render Manager {driver}"));
            }
        }

        // SBC fallback: the board model names the integrated VideoCore.
        let model = std::fs::read_to_string(&self.dt_model_path).ok()?;
        model
            .contains("Raspberry Pi")
            .then(|| "Broadcom VideoCore (Integrated)".to_string())
    }
}

fn is_display_class(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("vga") || lower.contains("3d") || lower.contains("display")
}

fn is_excluded(name: &str) -> bool {
    EXCLUDE_PATTERNS.iter().any(|re| re.is_match(name))
}

/// Device name from an lspci line: text after the last colon, trailing
/// "(rev xx)" stripped.
fn extract_pci_name(line: &str) -> Option<String> {
    let idx = line.rfind(':')?;
    let mut name = line[idx + 1..].trim();
    if let Some(paren) = name.rfind('(') {
        name = name[..paren].trim_end();
    }
    (!name.is_empty()).then(|| name.to_string())
}

/// Fixed human-readable labels for DRM drivers with no decodable SoC model.
fn driver_label(driver: &str) -> Option<&'static str> {
    Some(match driver {
        "vc4" | "vc4-drm" => "Broadcom VideoCore IV/VI (Raspberry Pi)",
        "v3d" | "v3d-drm" => "Broadcom V3D (Raspberry Pi 4/5)",
        "msm" | "msm_drm" => "Qualcomm Adreno (Unknown Model)",
        "panfrost" => "ARM Mali (Panfrost)",
        "lima" => "ARM Mali (Lima)",
        "sun4i-drm" | "sunxi-drm" => "Allwinner Display Engine",
        "tegra" => "NVIDIA Tegra",
        // LXC containers mapping a physical BMC adapter
        "ast" => "ASPEED Technology, Inc. ASPEED Graphics Family",
        "i915" | "i915-drm" => "Intel Integrated Graphics",
        "mgag200" => "Matrox G200 Series",
        _ => return None,
    })
}

/// Decode an exact SoC model from a device-tree compatible blob
/// (NUL-separated strings). Empty result falls through to the driver-name
/// label.
pub fn decode_soc_model(driver: &str, raw: &[u8]) -> Option<String> {
    let content = String::from_utf8_lossy(raw).replace('\0', " ");
    let lower = content.to_lowercase();

    if driver == "msm" || lower.contains("adreno") {
        if let Some(caps) = ADRENO_MODEL.captures(&lower) {
            return Some(format!("Qualcomm Adreno {}", &caps[1]));
        }
        return Some("Qualcomm Adreno".to_string());
    }

    if driver == "panfrost" || driver == "lima" || lower.contains("mali") {
        if let Some(caps) = MALI_MODEL.captures(&lower) {
            return Some(format!("ARM Mali {}", caps[1].to_uppercase()));
        }
        return Some("ARM Mali".to_string());
    }

    if matches!(driver, "vc4" | "vc4-drm" | "v3d") {
        if lower.contains("bcm2712") {
            return Some("Broadcom VideoCore VII (Pi 5)".to_string());
        }
        if lower.contains("bcm2711") {
            return Some("Broadcom VideoCore VI (Pi 4)".to_string());
        }
        if lower.contains("bcm2837") || lower.contains("bcm2835") {
            return Some("Broadcom VideoCore IV".to_string());
        }
    }

    // "allwinner,sun50i-h6-display-engine"
    if lower.contains("allwinner") || lower.contains("sun50i") || lower.contains("sun8i") {
        if let Some(caps) = SUNXI_MODEL.captures(&lower) {
            return Some(format!("Allwinner {}", caps[1].to_uppercase()));
        }
        return Some("Allwinner Display Engine".to_string());
    }

    if driver == "tegra" {
        if lower.contains("tegra194") {
            return Some("NVIDIA Tegra Xavier".to_string());
        }
        if lower.contains("tegra234") {
            return Some("NVIDIA Orin".to_string());
        }
        if lower.contains("tegra210") {
            return Some("NVIDIA Tegra X1".to_string());
        }
    }

    None
}
