//! Shell command lines issued to the privileged session.
//!
//! Addresses, interface names and paths are interpolated verbatim; callers trim them and check
//! them with [`is_shell_word`] first.

use std::path::Path;

/// True when `value` is non-empty and made only of characters the shell passes through
/// literally (no whitespace, quoting, expansion, redirection or command separators).
pub fn is_shell_word(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-.:/@%+,".contains(c))
}

pub fn is_shell_path(path: &Path) -> bool {
    path.to_str().is_some_and(is_shell_word)
}

/// Bring the interface up, then set its hardware address.
pub fn interface_reconfigure(busybox: &str, interface: &str, address: &str) -> String {
    format!(
        "{bb} ifconfig {iface} up; {bb} ifconfig {iface} hw ether {addr}",
        bb = busybox,
        iface = interface,
        addr = address
    )
}

/// Overwrite the address-holding file with a single address.
pub fn write_address_file(address: &str, file: &Path) -> String {
    format!("echo {} > {}", address, file.display())
}

pub fn copy(src: &Path, dst: &Path) -> String {
    format!("cp {} {}", src.display(), dst.display())
}

/// Print the link-layer address of `interface` (third field of the second `ip link` line).
pub fn read_link_address(busybox: &str, interface: &str) -> String {
    format!(
        "{} ip link show {} | sed -n 2p | tr -s ' ' | cut -d ' ' -f3",
        busybox, interface
    )
}

/// In-place replacement of one known address. Keeps a `.tmpBk` copy next to the file.
pub fn substitute_address(current: &str, new: &str, file: &Path) -> String {
    format!("sed -i.tmpBk s/{}/{}/g {}", current, new, file.display())
}

/// In-place replacement of anything shaped like `xx:xx:xx:xx:xx:xx`.
pub fn substitute_any_address(new: &str, file: &Path) -> String {
    format!(
        "sed -i.tmpBk s/..:..:..:..:..:../{}/g {}",
        new,
        file.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_words() {
        for ok in ["wlan0", "rmnet_data0", "AA:BB:CC:DD:EE:FF", "/efs/wifi/.mac.info", ".bak"] {
            assert!(is_shell_word(ok), "{}", ok);
        }
        for bad in [
            "",
            "wlan0; reboot",
            "wlan0 up",
            "$(reboot)",
            "`id`",
            "a|b",
            "a&b",
            "a>b",
            "it's",
            "\"x\"",
            "wlan0\nreboot",
            "*",
        ] {
            assert!(!is_shell_word(bad), "{}", bad);
        }
        assert!(is_shell_path(Path::new("/persist/wifi/.macaddr")));
        assert!(!is_shell_path(Path::new("/sdcard/my wifi/.mac.info")));
    }

    #[test]
    fn reconfigure_brings_interface_up_first() {
        assert_eq!(
            interface_reconfigure("busybox", "wlan0", "AA:BB:CC:DD:EE:FF"),
            "busybox ifconfig wlan0 up; busybox ifconfig wlan0 hw ether AA:BB:CC:DD:EE:FF"
        );
    }

    #[test]
    fn file_commands() {
        let file = Path::new("/efs/wifi/.mac.info");
        assert_eq!(
            write_address_file("02:00:00:00:00:01", file),
            "echo 02:00:00:00:00:01 > /efs/wifi/.mac.info"
        );
        assert_eq!(
            copy(file, Path::new("/efs/wifi/.mac.info.bak")),
            "cp /efs/wifi/.mac.info /efs/wifi/.mac.info.bak"
        );
    }

    #[test]
    fn link_address_pipeline() {
        assert_eq!(
            read_link_address("busybox", "wlan0"),
            "busybox ip link show wlan0 | sed -n 2p | tr -s ' ' | cut -d ' ' -f3"
        );
    }

    #[test]
    fn sed_substitutions() {
        let nvram = Path::new("/system/etc/wifi/nvram.txt");
        assert_eq!(
            substitute_address("11:22:33:44:55:66", "AA:BB:CC:DD:EE:FF", nvram),
            "sed -i.tmpBk s/11:22:33:44:55:66/AA:BB:CC:DD:EE:FF/g /system/etc/wifi/nvram.txt"
        );
        assert_eq!(
            substitute_any_address("AA:BB:CC:DD:EE:FF", nvram),
            "sed -i.tmpBk s/..:..:..:..:..:../AA:BB:CC:DD:EE:FF/g /system/etc/wifi/nvram.txt"
        );
    }
}
