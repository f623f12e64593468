//! GraphQL documents understood by the backend

use super::OperationDocument;

pub const LOGIN: OperationDocument = OperationDocument::mutation(
    "login",
    "login",
    r"mutation Login($email: String!, $password: String!) {
  login(email: $email, password: $password) {
    status
    code
    message
    data {
      idToken
      refreshToken
      userId
      email
    }
  }
}",
);

pub const REGISTER: OperationDocument = OperationDocument::mutation(
    "register",
    "register",
    r"mutation Register($email: String!, $password: String!, $name: String!) {
  register(email: $email, password: $password, name: $name) {
    idToken
    refreshToken
    user {
      id
      email
      name
    }
  }
}",
);

pub const REFRESH_TOKEN: OperationDocument = OperationDocument::mutation(
    "refreshToken",
    "refreshToken",
    r"mutation RefreshToken($refreshToken: String!) {
  refreshToken(refreshToken: $refreshToken) {
    idToken
    refreshToken
    uid
    email
  }
}",
);

pub const VERIFY_TOKEN: OperationDocument = OperationDocument::query(
    "verifyToken",
    "verifyToken",
    r"query VerifyToken($idToken: String) {
  verifyToken(idToken: $idToken) {
    status
    code
    message
    data {
      uid
      email
    }
  }
}",
);

pub const GET_USER_PROFILE: OperationDocument = OperationDocument::query(
    "getUserProfile",
    "getUserProfile",
    r"query GetUserProfile {
  getUserProfile {
    id
    email
    name
    createdAt
  }
}",
);

pub const CREATE_USER: OperationDocument = OperationDocument::mutation(
    "createUser",
    "createUser",
    r"mutation CreateUser(
  $firstName: String!
  $lastName: String!
  $username: String!
  $email: String!
  $password: String!
  $dob: String!
  $phoneNumber: String!
) {
  createUser(
    firstName: $firstName
    lastName: $lastName
    username: $username
    email: $email
    password: $password
    dob: $dob
    phoneNumber: $phoneNumber
  ) {
    status
    code
    message
  }
}",
);

// The backend exposes this field with a leading capital.
pub const SEND_OTP_FOR_SIGNUP: OperationDocument = OperationDocument::mutation(
    "sendOtpForSignup",
    "SendOtpForSignup",
    r"mutation SendOtpForSignup($email: String!) {
  SendOtpForSignup(email: $email) {
    status
    code
    message
  }
}",
);

pub const VERIFY_OTP_FOR_SIGNUP: OperationDocument = OperationDocument::mutation(
    "verifyOtpForSignup",
    "verifyOtpForSignup",
    r"mutation VerifyOtpForSignup($email: String!, $otp: String!) {
  verifyOtpForSignup(email: $email, otp: $otp) {
    status
    code
    message
  }
}",
);

pub const SEND_PASSWORD_RESET_EMAIL: OperationDocument = OperationDocument::mutation(
    "sendPasswordResetEmail",
    "sendPasswordResetEmail",
    r"mutation SendPasswordResetEmail($email: String!) {
  sendPasswordResetEmail(email: $email) {
    status
    code
    message
  }
}",
);

pub const SEND_PASSWORD_RESET_PHONE: OperationDocument = OperationDocument::mutation(
    "sendPasswordResetPhone",
    "sendPasswordResetPhone",
    r"mutation SendPasswordResetPhone($phoneNumber: String!) {
  sendPasswordResetPhone(phoneNumber: $phoneNumber) {
    status
    code
    message
  }
}",
);

/// Every document in the catalogue
pub static ALL: [OperationDocument; 10] = [
    LOGIN,
    REGISTER,
    REFRESH_TOKEN,
    VERIFY_TOKEN,
    GET_USER_PROFILE,
    CREATE_USER,
    SEND_OTP_FOR_SIGNUP,
    VERIFY_OTP_FOR_SIGNUP,
    SEND_PASSWORD_RESET_EMAIL,
    SEND_PASSWORD_RESET_PHONE,
];

/// Look up a catalogue document by registry name
#[must_use]
pub fn by_name(name: &str) -> Option<&'static OperationDocument> {
    ALL.iter().find(|doc| doc.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        for (i, a) in ALL.iter().enumerate() {
            for b in &ALL[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_documents_select_their_root_field() {
        for doc in &ALL {
            assert!(
                doc.source.contains(&format!("{}(", doc.root_field))
                    || doc.source.contains(&format!("{} {{", doc.root_field)),
                "{} does not select {}",
                doc.name,
                doc.root_field
            );
        }
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(by_name("login"), Some(&LOGIN));
        assert_eq!(by_name("SendOtpForSignup"), None);
    }
}
