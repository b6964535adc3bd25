use std::io::{Error, ErrorKind, Result};
use std::net::IpAddr;

// NI_MAXHOST from netdb.h, libc does not export it on every target.
#[cfg(unix)]
const NI_MAXHOST: usize = 1025;

/// Resolves the name the PTR record of `ip` points to.
///
/// Unlike `getnameinfo` with default flags, an address without a name is an
/// error rather than its numeric form.
#[cfg(unix)]
pub fn lookup_addr(ip: &IpAddr) -> Result<String> {
    // SAFETY: both sockaddr structs are plain data, all zero is a valid value.
    let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };

    let len = match ip {
        IpAddr::V4(v4) => {
            // SAFETY: sockaddr_storage is large and aligned enough for any
            // sockaddr, that is its purpose.
            let sin = unsafe { &mut *(&mut storage as *mut _ as *mut libc::sockaddr_in) };
            sin.sin_family = libc::AF_INET as libc::sa_family_t;
            sin.sin_addr = libc::in_addr {
                s_addr: u32::from_ne_bytes(v4.octets()),
            };

            std::mem::size_of::<libc::sockaddr_in>()
        }
        IpAddr::V6(v6) => {
            // SAFETY: see above
            let sin6 = unsafe { &mut *(&mut storage as *mut _ as *mut libc::sockaddr_in6) };
            sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sin6.sin6_addr = libc::in6_addr {
                s6_addr: v6.octets(),
            };

            std::mem::size_of::<libc::sockaddr_in6>()
        }
    };

    let mut buf = vec![0u8; NI_MAXHOST];

    // SAFETY: `storage` holds an initialized sockaddr of `len` bytes, and
    // `buf` is valid for writes of its whole length. No service is asked for.
    let rc = unsafe {
        libc::getnameinfo(
            &storage as *const _ as *const libc::sockaddr,
            len as libc::socklen_t,
            buf.as_mut_ptr().cast::<libc::c_char>(),
            buf.len() as libc::socklen_t,
            std::ptr::null_mut(),
            0,
            libc::NI_NAMEREQD,
        )
    };

    if rc != 0 {
        if rc == libc::EAI_SYSTEM {
            return Err(Error::last_os_error());
        }

        // SAFETY: gai_strerror returns a pointer to a static string
        let reason = unsafe { std::ffi::CStr::from_ptr(libc::gai_strerror(rc)) };
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("reverse lookup of {ip} failed, {}", reason.to_string_lossy()),
        ));
    }

    let Some(zero_pos) = buf.iter().position(|&b| b == 0) else {
        return Err(Error::other("could not find NUL terminator in hostname"));
    };
    buf.truncate(zero_pos);

    String::from_utf8(buf).map_err(|err| Error::new(ErrorKind::InvalidData, err))
}

#[cfg(not(unix))]
pub fn lookup_addr(_ip: &IpAddr) -> Result<String> {
    Err(Error::new(
        ErrorKind::Unsupported,
        "reverse lookup is not supported on this platform",
    ))
}
