//! Well-known service names for port relations.
//!
//! Lookup keyed on protocol and port; anything unlisted is reported as
//! `Custom`. Database and WAS listen ports carry their product names so the
//! dependency view reads without a port reference at hand.

use std::collections::HashMap;

use once_cell::sync::Lazy;

static TCP_SERVICES: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (1, "TCPMUX"),
        (7, "Echo"),
        (9, "Discard"),
        (13, "Daytime"),
        (17, "QOTD"),
        (18, "Message Send"),
        (19, "CHARGEN"),
        (20, "FTP"),
        (21, "FTP"),
        (22, "SSH"),
        (23, "Telnet"),
        (25, "SMTP"),
        (37, "Time"),
        (43, "WHOIS"),
        (49, "TACACS"),
        (53, "DNS"),
        (70, "Gopher"),
        (79, "Finger"),
        (80, "HTTP"),
        (88, "Kerberos"),
        (95, "SUPDUP"),
        (109, "POP2"),
        (110, "POP3"),
        (113, "Ident"),
        (119, "NNTP"),
        (123, "NTP"),
        (139, "NetBIOS"),
        (143, "IMAP4"),
        (152, "BFTP"),
        (153, "SGMP"),
        (156, "SQL"),
        (158, "DMSP"),
        (162, "SNMPTRAP"),
        (177, "XDMCP"),
        (179, "BGP"),
        (194, "IRC"),
        (199, "SMUX"),
        (213, "IPX"),
        (218, "MPP"),
        (220, "IMAP3"),
        (259, "ESRO"),
        (262, "Arcisdms"),
        (264, "BGMP"),
        (318, "TSP"),
        (350, "MATIP"),
        (351, "MATIP"),
        (366, "ODMR"),
        (369, "Rpc2portmap"),
        (387, "AURP"),
        (389, "LDAP"),
        (401, "UPS"),
        (427, "SLP"),
        (433, "NNSP"),
        (443, "HTTPS"),
        (444, "SNPP"),
        (445, "Microsoft-DS"),
        (464, "Kerberos"),
        (465, "SMTPS"),
        (497, "Retrospect"),
        (502, "Modbus"),
        (504, "Citadel"),
        (510, "FCP"),
        (512, "Rexec"),
        (513, "rlogin"),
        (515, "LPD"),
        (520, "EFS"),
        (524, "NCP"),
        (530, "RPC"),
        (540, "UUCP"),
        (542, "commerce"),
        (543, "klogin"),
        (544, "kshell"),
        (546, "DHCPv6 client"),
        (547, "DHCPv6 server"),
        (548, "AFP"),
        (550, "new-rwho"),
        (554, "RTSP"),
        (556, "RFS"),
        (563, "NNTPS"),
        (587, "SMTP"),
        (591, "FileMaker 6.0"),
        (631, "IPP"),
        (635, "RLZ DBase"),
        (636, "LDAPS"),
        (639, "MSDP"),
        (643, "SANity"),
        (646, "LDP"),
        (647, "DHCP Failover"),
        (648, "RRP"),
        (651, "IEEE-MMS"),
        (654, "MMS"),
        (674, "ACAP"),
        (688, "REALM-RUSD"),
        (690, "VATP"),
        (691, "MS Exchange Routing"),
        (695, "IEEE-MMS-SSL"),
        (700, "EPP"),
        (701, "LMP"),
        (702, "IRIS over BEEP"),
        (706, "SILC"),
        (712, "TBRPF"),
        (749, "Kerberos"),
        (753, "RRH"),
        (754, "tell send"),
        (800, "mdbs-daemon"),
        (802, "Modbus"),
        (830, "NETCONF over SSH"),
        (831, "NETCONF over BEEP"),
        (832, "NETCONF for SOAP over HTTPS"),
        (833, "NETCONF for SOAP over BEEP"),
        (847, "DHCP Failover protocol"),
        (848, "GDOI"),
        (853, "DNS over TLS"),
        (860, "iSCSI"),
        (861, "OWAMP"),
        (862, "TWAMP"),
        (873, "rsync"),
        (953, "RNDC"),
        (989, "FTP over TLS/SSL"),
        (990, "FTP over TLS/SSL"),
        (991, "NAS"),
        (992, "Telnet over TLS/SSL"),
        (993, "IMAPS"),
        (995, "POP3S"),
        (3389, "RDP"),
        (5985, "WinRM"),
        (5986, "WinRM"),
        // Databases
        (1521, "Oracle"),
        (3306, "MySQL"),
        (1433, "MS-SQL"),
        (5432, "PostgreSQL"),
        (50000, "DB2"),
        (1526, "Informix"),
        (5000, "Sybase"),
        (1527, "Derby"),
        (5984, "CouchDB"),
        (27017, "MongoDB"),
        (27018, "MongoDB"),
        (27019, "MongoDB"),
        (28017, "MongoDB"),
        (2181, "ZooKeeper"),
        (60000, "Hadoop"),
        (60010, "Hadoop"),
        (60020, "Hadoop"),
        (60030, "Hadoop"),
        (7000, "Cassandra"),
        // WAS default listeners
        (8080, "HTTP"),
        (7001, "HTTP"),
        (9043, "HTTP"),
        (9736, "HTTP"),
    ])
});

static UDP_SERVICES: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (7, "Echo"),
        (9, "Discard"),
        (11, "Active Users"),
        (13, "Daytime"),
        (17, "QOTD"),
        (18, "Message Send"),
        (19, "CHARGEN"),
        (37, "Time"),
        (42, "Host Name Server"),
        (49, "TACACS Login"),
        (53, "DNS"),
        (67, "BOOTP"),
        (68, "BOOTP"),
        (69, "TFTP"),
        (80, "HTTP"),
        (88, "Kerberos"),
        (104, "DICOM"),
        (105, "CCSO Nameserver"),
        (107, "Rtelnet"),
        (108, "SNA"),
        (111, "ONC RPC"),
        (117, "UUCP"),
        (118, "SQL"),
        (123, "NTP"),
        (152, "BFTP"),
        (153, "SGMP"),
        (156, "SQL"),
        (158, "DMSP"),
        (161, "SNMP"),
        (162, "SNMPTRAP"),
        (177, "XDMCP"),
        (194, "IRC"),
        (199, "SMUX"),
        (213, "IPX"),
        (218, "MPP"),
        (220, "IMAP3"),
        (259, "ESRO"),
        (264, "BGMP"),
        (280, "http-mgmt"),
        (318, "TSP"),
        (319, "PTP"),
        (320, "PTP"),
        (350, "MATIP"),
        (351, "MATIP"),
        (366, "ODMR"),
        (387, "AURP"),
        (401, "UPS"),
        (427, "SLP"),
        (433, "NNSP"),
        (443, "HTTPS"),
        (444, "SNPP"),
        (445, "Microsoft-DS"),
        (464, "Kerberos"),
        (497, "Retrospect"),
        (500, "ISAKMP"),
        (502, "Modbus"),
        (510, "RIP"),
        (513, "Who"),
        (514, "Syslog"),
        (517, "Talk"),
        (518, "NTalk"),
        (521, "RIPng"),
        (524, "NCP"),
        (530, "RPC"),
        (546, "DHCPv6 client"),
        (547, "DHCPv6 server"),
        (554, "RTSP"),
        (560, "rmonitor"),
        (561, "monitor"),
        (563, "NNTPS"),
        (623, "ASF-RMCP"),
        (631, "IPP"),
        (635, "RLZ"),
        (639, "MSDP"),
        (643, "SANity"),
        (646, "LDP"),
        (800, "mdbs-daemon"),
        (830, "NETCONF over SSH"),
        (831, "NETCONF over BEEP"),
        (832, "NETCONF over HTTPS"),
        (833, "NETCONF"),
        (848, "GDOI"),
        (853, "DNS over TLS"),
        (861, "OWAMP"),
        (862, "TWAMP"),
        (989, "FTPS over TLS/SSL"),
        (990, "FTPS over TLS/SSL"),
        (992, "Telnet over TLS/SSL"),
        (995, "POP3S"),
    ])
});

/// Service name for a protocol and port. The protocol match is a substring
/// check, so `tcp6` and `udp4` resolve like their base protocols.
pub fn service_for(protocol: &str, port: u16) -> String {
    let upper = protocol.to_ascii_uppercase();
    let name = if upper.contains("TCP") {
        TCP_SERVICES.get(&port).copied()
    } else if upper.contains("UDP") {
        UDP_SERVICES.get(&port).copied()
    } else {
        None
    };
    name.unwrap_or("Custom").to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_and_udp_tables_differ() {
        assert_eq!(service_for("tcp", 22), "SSH");
        assert_eq!(service_for("udp", 161), "SNMP");
        assert_eq!(service_for("udp", 22), "Custom");
    }

    #[test]
    fn protocol_variants_resolve_like_their_base() {
        assert_eq!(service_for("tcp6", 5432), "PostgreSQL");
        assert_eq!(service_for("udp4", 514), "Syslog");
    }

    #[test]
    fn unknown_ports_and_protocols_are_custom() {
        assert_eq!(service_for("tcp", 48213), "Custom");
        assert_eq!(service_for("icmp", 80), "Custom");
    }

    #[test]
    fn was_listeners_report_http() {
        for port in [8080, 7001, 9043, 9736] {
            assert_eq!(service_for("tcp", port), "HTTP");
        }
    }
}
